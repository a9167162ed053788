#[cfg(not(target_arch = "wasm32"))]
mod native {
    extern crate quill;

    use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
    use quill::core::db::{seed_demo_data, MemoryStore};
    use quill::mailer::LogMailer;
    use quill::media::KvMediaHost;
    use tracing::{info, warn};
    use tracing_subscriber::EnvFilter;

    mod adapter {
        use actix_web::HttpRequest;
        use spin_sdk::http::{Method, Request};

        pub fn actix_to_spin_request(req: &HttpRequest, body: actix_web::web::Bytes) -> Request {
            let method = match req.method().as_str() {
                "GET" => Method::Get,
                "POST" => Method::Post,
                "PUT" => Method::Put,
                "DELETE" => Method::Delete,
                "HEAD" => Method::Head,
                "OPTIONS" => Method::Options,
                "PATCH" => Method::Patch,
                other => Method::Other(other.to_string()),
            };

            let uri = req.uri().to_string();
            let mut builder = Request::builder();
            builder.method(method).uri(uri);

            for (name, value) in req.headers() {
                if let Ok(val_str) = value.to_str() {
                    builder.header(name.as_str(), val_str);
                }
            }

            builder.body(body.to_vec()).build()
        }

        pub fn spin_to_actix_response(spin_resp: spin_sdk::http::Response) -> actix_web::HttpResponse {
            let status = *spin_resp.status();
            let content_type = spin_resp
                .header("content-type")
                .and_then(|v| v.as_str())
                .map(str::to_string);
            let body = spin_resp.body().to_vec();

            let mut response = actix_web::HttpResponse::build(
                actix_web::http::StatusCode::from_u16(status)
                    .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR),
            );
            if let Some(content_type) = content_type {
                response.content_type(content_type);
            }

            response.body(body)
        }
    }

    struct State {
        store: MemoryStore,
        media_base_url: String,
        mailer: LogMailer,
    }

    pub async fn run() -> std::io::Result<()> {
        dotenvy::dotenv().ok();
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .init();

        let state = web::Data::new(State {
            store: MemoryStore::new(),
            media_base_url: quill::config::media_base_url(),
            mailer: LogMailer,
        });

        if quill::config::seed_demo() {
            if let Err(e) = seed_demo_data(&state.store) {
                warn!(error = %e, "failed to seed demo data");
            }
        }

        let port = quill::config::port();
        info!("Server listening on http://0.0.0.0:{}", port);

        HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .app_data(web::PayloadConfig::new(quill::config::MAX_IMAGE_BYTES * 2))
                .default_service(web::route().to(handle_all))
        })
        .bind(("0.0.0.0", port))?
        .run()
        .await
    }

    async fn handle_all(state: web::Data<State>, req: HttpRequest, body: web::Bytes) -> HttpResponse {
        let spin_req = adapter::actix_to_spin_request(&req, body);

        let media = KvMediaHost::new(&state.store, state.media_base_url.clone());
        let app = quill::App {
            store: &state.store,
            media: &media,
            mailer: &state.mailer,
        };

        adapter::spin_to_actix_response(quill::router::route(&app, spin_req))
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    native::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
