use std::env;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use dotenvy::dotenv;
use storefront_service::domain::pricing::{PricingConfig, ShippingPolicy};
use storefront_service::{build_server, create_pool, run_migrations};

fn pricing_from_env() -> PricingConfig {
    let defaults = PricingConfig::default();

    let tax_rate = env::var("TAX_RATE")
        .ok()
        .and_then(|v| BigDecimal::from_str(&v).ok())
        .unwrap_or(defaults.tax_rate);

    let rate = env::var("SHIPPING_FLAT_RATE")
        .ok()
        .and_then(|v| BigDecimal::from_str(&v).ok())
        .unwrap_or_else(|| BigDecimal::from(10));
    let shipping = match env::var("SHIPPING_FREE_THRESHOLD")
        .ok()
        .and_then(|v| BigDecimal::from_str(&v).ok())
    {
        Some(threshold) => ShippingPolicy::FreeOverThreshold { threshold, rate },
        None => ShippingPolicy::FlatRate(rate),
    };

    PricingConfig { tax_rate, shipping }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .expect("PORT must be a valid number");

    let pool = create_pool(&database_url);
    run_migrations(&pool);

    log::info!("Starting server at http://{}:{}", host, port);

    build_server(pool, pricing_from_env(), &host, port)?.await
}
