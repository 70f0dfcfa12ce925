mod cart;
mod docs;
mod health;
mod products;
mod users;

use aide::axum::{
    routing::{get, put},
    ApiRouter,
};

/// Creates the router with all handler routes
pub fn handler() -> ApiRouter {
    ApiRouter::new()
        .merge(docs::handler())
        .api_route("/health", get(health::handler))
        .api_route("/users", get(users::list_users).post(users::create_user))
        .api_route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .api_route(
            "/products",
            get(products::list_products).post(products::create_product),
        )
        .api_route(
            "/products/{id}",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .api_route(
            "/cart/{user_id}",
            get(cart::get_cart)
                .post(cart::add_to_cart)
                .delete(cart::clear_cart),
        )
        .api_route(
            "/cart/{user_id}/{product_id}",
            put(cart::set_cart_item_amount).delete(cart::remove_cart_item),
        )
}
