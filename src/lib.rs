pub mod application;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::cart_service::CartService;
use application::catalog_service::CatalogService;
use application::order_service::OrderService;
use domain::pricing::PricingConfig;
use infrastructure::cart_repo::DieselCartRepository;
use infrastructure::catalog_repo::DieselCatalogRepository;
use infrastructure::order_repo::DieselOrderRepository;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) {
    let mut conn = pool.get().expect("Failed to get DB connection for migrations");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run database migrations");
}

/// Services shared across workers. Each service owns a Diesel-backed
/// repository over the same connection pool.
pub struct AppState {
    pub catalog: CatalogService<DieselCatalogRepository>,
    pub carts: CartService<DieselCartRepository>,
    pub orders: OrderService<DieselOrderRepository>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::carts::get_cart,
        handlers::carts::add_item,
        handlers::carts::update_item,
        handlers::carts::remove_item,
        handlers::carts::clear_cart,
        handlers::carts::validate_cart,
        handlers::orders::create_order,
        handlers::orders::list_own_orders,
        handlers::orders::list_all_orders,
        handlers::orders::search_orders,
        handlers::orders::get_order,
        handlers::orders::cancel_order,
        handlers::orders::update_order_status,
        handlers::orders::update_payment_status,
        handlers::orders::add_order_notes,
        handlers::orders::process_refund,
        handlers::orders::delete_order,
        handlers::products::get_product,
        handlers::products::check_availability,
        handlers::products::adjust_stock,
    ),
    tags(
        (name = "cart", description = "Shopping cart"),
        (name = "orders", description = "Checkout and order lifecycle"),
        (name = "products", description = "Catalog reads and stock"),
    )
)]
pub struct ApiDoc;

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    pool: DbPool,
    pricing: PricingConfig,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let state = web::Data::new(AppState {
        catalog: CatalogService::new(DieselCatalogRepository::new(pool.clone())),
        carts: CartService::new(DieselCartRepository::new(pool.clone())),
        orders: OrderService::new(DieselOrderRepository::new(pool), pricing),
    });
    let openapi = ApiDoc::openapi();

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .service(
                web::scope("/cart")
                    .route("", web::get().to(handlers::carts::get_cart))
                    .route("/items", web::post().to(handlers::carts::add_item))
                    .route(
                        "/items/{product_id}",
                        web::put().to(handlers::carts::update_item),
                    )
                    .route(
                        "/items/{product_id}",
                        web::delete().to(handlers::carts::remove_item),
                    )
                    .route("/clear", web::post().to(handlers::carts::clear_cart))
                    .route("/validate", web::get().to(handlers::carts::validate_cart)),
            )
            .service(
                web::scope("/orders")
                    // Literal segments must register ahead of "/{id}".
                    .route("/all", web::get().to(handlers::orders::list_all_orders))
                    .route("/search", web::get().to(handlers::orders::search_orders))
                    .route("", web::post().to(handlers::orders::create_order))
                    .route("", web::get().to(handlers::orders::list_own_orders))
                    .route("/{id}", web::get().to(handlers::orders::get_order))
                    .route("/{id}", web::delete().to(handlers::orders::delete_order))
                    .route("/{id}/cancel", web::post().to(handlers::orders::cancel_order))
                    .route(
                        "/{id}/status",
                        web::put().to(handlers::orders::update_order_status),
                    )
                    .route(
                        "/{id}/payment-status",
                        web::put().to(handlers::orders::update_payment_status),
                    )
                    .route(
                        "/{id}/notes",
                        web::post().to(handlers::orders::add_order_notes),
                    )
                    .route(
                        "/{id}/refund",
                        web::post().to(handlers::orders::process_refund),
                    ),
            )
            .service(
                web::scope("/products")
                    .route("/{id}", web::get().to(handlers::products::get_product))
                    .route(
                        "/{id}/availability",
                        web::get().to(handlers::products::check_availability),
                    )
                    .route(
                        "/{id}/stock",
                        web::put().to(handlers::products::adjust_stock),
                    ),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
