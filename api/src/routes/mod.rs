pub mod analyze_route;
pub mod health_route;
pub mod search_route;
pub mod voucher_routes;
