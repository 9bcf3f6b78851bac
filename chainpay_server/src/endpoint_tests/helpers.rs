use actix_web::{http::StatusCode, test, web::ServiceConfig, App};

/// Builds a test app from the given configuration and issues a GET request against it.
pub async fn get_request(path: &str, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    let app = test::init_service(App::new().configure(configure)).await;
    let req = test::TestRequest::get().uri(path).to_request();
    let resp = test::call_service(&app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    (status, String::from_utf8_lossy(&body).into_owned())
}
