mod auth_tests;
mod health_tests;
mod middleware_tests;
mod routing_tests;
