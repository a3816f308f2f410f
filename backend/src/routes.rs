use axum::{middleware, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};

use crate::{handlers, preview, request_context::request_context_middleware, state::AppState};

pub fn create_router(state: AppState) -> Router {
    // The JSON pagination proxy is read-only, so any origin may call it.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Logo, favicon and the rest of the public assets.
    let assets = ServeDir::new(&state.config.public_dir);

    Router::new()
        .route("/", get(handlers::home))
        .route("/post/:slug", get(handlers::post_page))
        .route("/api/posts", get(handlers::list_posts_page))
        .route("/api/preview", get(preview::enter_preview))
        .route("/api/exit-preview", get(preview::exit_preview))
        .route("/sitemap.xml", get(handlers::sitemap_xml))
        .route("/robots.txt", get(handlers::robots_txt))
        .route("/health", get(handlers::health))
        .fallback_service(assets)
        .with_state(state)
        .layer(cors)
        .layer(middleware::from_fn(request_context_middleware))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use std::time::Duration;

    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::{
        config::AppConfig,
        preview::{PreviewCookieSigner, PREVIEW_COOKIE_NAME},
        request_context::REQUEST_ID_HEADER,
    };

    const POSTS_QUERY: &str = r#"[[at(document.type,"post")]]"#;

    fn search_response(results: Vec<Value>, next_page: Option<&str>) -> Value {
        json!({
            "page": 1,
            "results_per_page": 1,
            "total_results_size": results.len(),
            "total_pages": 1,
            "next_page": next_page,
            "prev_page": null,
            "results": results
        })
    }

    fn post_document(id: &str, uid: &str, title: &str) -> Value {
        json!({
            "id": id,
            "uid": uid,
            "type": "post",
            "first_publication_date": "2021-03-25T19:25:28+0000",
            "last_publication_date": "2021-03-26T10:00:00+0000",
            "data": {
                "title": title,
                "subtitle": "Pensando em sincronização em vez de ciclos de vida.",
                "author": "Joseph Oliveira",
                "banner": { "url": "https://images.prismic.io/banner.png" },
                "content": [
                    {
                        "heading": "Proin et varius",
                        "body": [{ "type": "paragraph", "text": "one two three", "spans": [] }]
                    }
                ]
            }
        })
    }

    async fn mock_cms() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "refs": [
                    { "id": "master", "ref": "MASTER", "label": "Master", "isMasterRef": true }
                ]
            })))
            .mount(&server)
            .await;
        server
    }

    fn config_for(server: &MockServer) -> AppConfig {
        AppConfig::for_tests(&format!("{}/api/v2", server.uri()))
    }

    fn app_with(config: AppConfig) -> Router {
        create_router(AppState::new(config).expect("state"))
    }

    async fn app_for(server: &MockServer) -> Router {
        app_with(config_for(server))
    }

    /// A `Cookie` header value the test configuration accepts.
    fn preview_cookie(config: &AppConfig, reference: &str) -> String {
        let signer = PreviewCookieSigner::new(&config.preview_cookie_secret, false);
        format!("{PREVIEW_COOKIE_NAME}={}", signer.sign(reference))
    }

    async fn call_with_cookie(app: Router, uri: &str, cookie: &str) -> Response {
        let request = Request::builder()
            .uri(uri)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .expect("request");
        app.oneshot(request).await.expect("response")
    }

    fn header_str<'a>(response: &'a Response, name: header::HeaderName) -> Option<&'a str> {
        response.headers().get(name).and_then(|value| value.to_str().ok())
    }

    async fn call(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response")
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        String::from_utf8(bytes.to_vec()).expect("utf8 body")
    }

    #[tokio::test]
    async fn preview_sets_cookie_and_redirects_to_document() {
        let server = mock_cms().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/documents/search"))
            .and(query_param("ref", "preview-token"))
            .and(query_param("q", r#"[[at(document.id,"DOC1")]]"#))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(search_response(vec![post_document("DOC1", "abc", "Draft")], None)),
            )
            .mount(&server)
            .await;

        let response =
            call(app_for(&server).await, "/api/preview?token=preview-token&documentId=DOC1").await;

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .expect("set-cookie")
            .to_string();
        assert!(cookie.starts_with("ref="));
        assert!(cookie.contains("HttpOnly"));
        let body = body_text(response).await;
        assert!(body.contains(r#"content="0; url=/post/abc""#));
        assert!(body.contains(r#"window.location.href = "/post/abc""#));
    }

    #[tokio::test]
    async fn preview_with_rejected_token_is_unauthorized() {
        let server = mock_cms().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/documents/search"))
            .and(query_param("ref", "bad"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "ref not found" })))
            .mount(&server)
            .await;

        let response = call(app_for(&server).await, "/api/preview?token=bad&documentId=DOC1").await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        let body: Value = serde_json::from_str(&body_text(response).await).expect("json");
        assert_eq!(body, json!({ "message": "Invalid token" }));
    }

    #[tokio::test]
    async fn preview_without_parameters_is_unauthorized() {
        let server = mock_cms().await;
        let response = call(app_for(&server).await, "/api/preview").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn exit_preview_clears_cookie_and_returns_to_page() {
        let server = mock_cms().await;

        let response =
            call(app_for(&server).await, "/api/exit-preview?currentUrl=%2Fpost%2Fxyz").await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()),
            Some("/post/xyz")
        );
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .expect("set-cookie");
        assert!(cookie.contains("Max-Age=0"));

        let response = call(app_for(&server).await, "/api/exit-preview").await;
        assert_eq!(
            response.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()),
            Some("/")
        );

        let response = call(
            app_for(&server).await,
            "/api/exit-preview?currentUrl=https%3A%2F%2Fevil.example.com",
        )
        .await;
        assert_eq!(
            response.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()),
            Some("/")
        );
    }

    #[tokio::test]
    async fn home_lists_posts_with_load_more_button() {
        let server = mock_cms().await;
        let next_page = format!("{}/api/v2/documents/search?page=2", server.uri());
        Mock::given(method("GET"))
            .and(path("/api/v2/documents/search"))
            .and(query_param("ref", "MASTER"))
            .and(query_param("q", POSTS_QUERY))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_response(
                vec![post_document("DOC1", "como-utilizar-hooks", "Como utilizar Hooks")],
                Some(&next_page),
            )))
            .mount(&server)
            .await;

        let response = call(app_for(&server).await, "/").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(REQUEST_ID_HEADER).is_some());
        assert!(response
            .headers()
            .get_all(header::VARY)
            .iter()
            .any(|value| value == "Cookie"));
        let body = body_text(response).await;
        assert!(body.contains("Como utilizar Hooks"));
        assert!(body.contains(r#"href="/post/como-utilizar-hooks""#));
        assert!(body.contains("25 mar 2021"));
        assert!(body.contains("Carregar mais posts"));
        assert!(!body.contains("Sair do modo preview"));
    }

    #[tokio::test]
    async fn api_posts_follows_cursor_on_cms_origin() {
        let server = mock_cms().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/documents/search"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_response(
                vec![post_document("DOC2", "criando-um-app", "Criando um app CRA do zero")],
                None,
            )))
            .mount(&server)
            .await;
        let cursor = format!("{}/api/v2/documents/search?page=2", server.uri());
        let uri = format!("/api/posts?cursor={}", urlencoding::encode(&cursor));

        let response = call(app_for(&server).await, &uri).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_text(response).await).expect("json");
        assert_eq!(body["results"][0]["uid"], "criando-um-app");
        assert_eq!(body["next_page"], Value::Null);
    }

    #[tokio::test]
    async fn api_posts_rejects_foreign_or_missing_cursor() {
        let server = mock_cms().await;

        let uri = format!(
            "/api/posts?cursor={}",
            urlencoding::encode("https://evil.example.com/api/v2/documents/search?page=2")
        );
        let response = call(app_for(&server).await, &uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = call(app_for(&server).await, "/api/posts").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn post_page_renders_detail_navigation_and_comments() {
        let server = mock_cms().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/documents/search"))
            .and(query_param("q", r#"[[at(document.type,"post")][at(my.post.uid,"abc")]]"#))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(search_response(vec![post_document("DOC1", "abc", "Hooks")], None)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/documents/search"))
            .and(query_param("orderings", "[document.first_publication_date desc]"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_response(
                vec![post_document("DOC0", "older", "Older post")],
                None,
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/documents/search"))
            .and(query_param("orderings", "[document.first_publication_date]"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_response(vec![], None)))
            .mount(&server)
            .await;

        let response = call(app_for(&server).await, "/post/abc").await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("<title>Spacetraveling | Hooks</title>"));
        assert!(body.contains("1 min"));
        assert!(body.contains("* editado em 26 mar 2021"));
        assert!(body.contains("Post anterior"));
        assert!(body.contains(r#"href="/post/older""#));
        assert!(!body.contains("Próximo post"));
        assert!(body.contains(r#"id="utterances-comments""#));
    }

    #[tokio::test]
    async fn unknown_slug_serves_fallback_page() {
        let server = mock_cms().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/documents/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_response(vec![], None)))
            .mount(&server)
            .await;

        let response = call(app_for(&server).await, "/post/missing").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("Carregando..."));
    }

    #[tokio::test]
    async fn cms_outage_renders_error_page() {
        let server = mock_cms().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/documents/search"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let response = call(app_for(&server).await, "/").await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn sitemap_lists_every_post() {
        let server = mock_cms().await;
        let next_page = format!("{}/api/v2/documents/search?page=2", server.uri());
        Mock::given(method("GET"))
            .and(path("/api/v2/documents/search"))
            .and(query_param("page", "2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(search_response(vec![post_document("DOC2", "second", "B")], None)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/documents/search"))
            .and(query_param("pageSize", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_response(
                vec![post_document("DOC1", "first", "A")],
                Some(&next_page),
            )))
            .mount(&server)
            .await;

        let response = call(app_for(&server).await, "/sitemap.xml").await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("<loc>https://blog.example.com/post/first</loc>"));
        assert!(body.contains("<loc>https://blog.example.com/post/second</loc>"));
        assert!(body.contains("<lastmod>2021-03-25</lastmod>"));
    }

    #[tokio::test]
    async fn robots_and_health() {
        let server = mock_cms().await;

        let response = call(app_for(&server).await, "/robots.txt").await;
        assert!(body_text(response)
            .await
            .contains("Sitemap: https://blog.example.com/sitemap.xml"));

        let response = call(app_for(&server).await, "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_text(response).await).expect("json");
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn previewing_home_reads_the_preview_ref() {
        let server = mock_cms().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/documents/search"))
            .and(query_param("ref", "preview-token"))
            .and(query_param("q", POSTS_QUERY))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_response(
                vec![post_document("DOC9", "rascunho", "Rascunho em revisão")],
                None,
            )))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/documents/search"))
            .and(query_param("ref", "MASTER"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_response(vec![], None)))
            .expect(0)
            .mount(&server)
            .await;
        let config = config_for(&server);
        let cookie = preview_cookie(&config, "preview-token");

        let response = call_with_cookie(app_with(config), "/", &cookie).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, header::CACHE_CONTROL), Some("private, no-store"));
        let body = body_text(response).await;
        assert!(body.contains("Rascunho em revisão"));
        assert!(body.contains("Sair do modo preview"));
        assert!(body.contains(r#"href="/api/exit-preview?currentUrl=%2F""#));
        server.verify().await;
    }

    #[tokio::test]
    async fn previewing_post_page_pins_every_query_to_the_preview_ref() {
        let server = mock_cms().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/documents/search"))
            .and(query_param("ref", "preview-token"))
            .and(query_param("q", r#"[[at(document.type,"post")][at(my.post.uid,"abc")]]"#))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(search_response(vec![post_document("DOC1", "abc", "Draft")], None)),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/documents/search"))
            .and(query_param("ref", "preview-token"))
            .and(query_param("after", "DOC1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_response(vec![], None)))
            .expect(2)
            .mount(&server)
            .await;
        let config = config_for(&server);
        let cookie = preview_cookie(&config, "preview-token");

        let response = call_with_cookie(app_with(config), "/post/abc", &cookie).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, header::CACHE_CONTROL), Some("private, no-store"));
        let body = body_text(response).await;
        assert!(body.contains("<title>Spacetraveling | Draft</title>"));
        assert!(body.contains(r#"href="/api/exit-preview?currentUrl=%2Fpost%2Fabc""#));
        server.verify().await;
    }

    #[tokio::test]
    async fn published_pages_are_cached_and_preview_pages_are_not() {
        let server = mock_cms().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/documents/search"))
            .and(query_param("ref", "MASTER"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_response(
                vec![post_document("DOC1", "publicado", "Publicado")],
                None,
            )))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/documents/search"))
            .and(query_param("ref", "preview-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_response(
                vec![post_document("DOC2", "rascunho", "Rascunho")],
                None,
            )))
            .expect(2)
            .mount(&server)
            .await;
        let mut config = config_for(&server);
        config.page_revalidate = Duration::from_secs(60);
        let cookie = preview_cookie(&config, "preview-token");
        let app = app_with(config);

        let first = call(app.clone(), "/").await;
        assert_eq!(
            header_str(&first, header::CACHE_CONTROL),
            Some("public, max-age=0, must-revalidate")
        );
        let first = body_text(first).await;
        let second = body_text(call(app.clone(), "/").await).await;
        assert_eq!(first, second);
        assert!(second.contains("Publicado"));

        for _ in 0..2 {
            let body = body_text(call_with_cookie(app.clone(), "/", &cookie).await).await;
            assert!(body.contains("Rascunho"));
            assert!(!body.contains("Publicado"));
        }

        let after_preview = body_text(call(app, "/").await).await;
        assert!(after_preview.contains("Publicado"));
        server.verify().await;
    }

    #[tokio::test]
    async fn stale_preview_ref_keeps_the_exit_link() {
        let server = mock_cms().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/documents/search"))
            .and(query_param("ref", "expired-ref"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "ref expired" })))
            .mount(&server)
            .await;
        let config = config_for(&server);
        let cookie = preview_cookie(&config, "expired-ref");
        let app = app_with(config);

        let response = call_with_cookie(app.clone(), "/post/abc", &cookie).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_text(response).await;
        assert!(body.contains("Sair do modo preview"));
        assert!(body.contains(r#"href="/api/exit-preview?currentUrl=%2Fpost%2Fabc""#));

        let response = call_with_cookie(app, "/", &cookie).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(body_text(response)
            .await
            .contains(r#"href="/api/exit-preview?currentUrl=%2F""#));
    }

    #[tokio::test]
    async fn cursors_never_carry_the_access_token() {
        let server = mock_cms().await;
        let search = format!("{}/api/v2/documents/search", server.uri());
        Mock::given(method("GET"))
            .and(path("/api/v2/documents/search"))
            .and(query_param("page", "2"))
            .and(query_param("access_token", "SECRET123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_response(
                vec![post_document("DOC2", "segundo", "Segundo")],
                Some(&format!("{search}?ref=MASTER&access_token=SECRET123&page=3")),
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/documents/search"))
            .and(query_param("ref", "MASTER"))
            .and(query_param("access_token", "SECRET123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_response(
                vec![post_document("DOC1", "primeiro", "Primeiro")],
                Some(&format!("{search}?ref=MASTER&access_token=SECRET123&page=2")),
            )))
            .mount(&server)
            .await;
        let mut config = config_for(&server);
        config.cms_access_token = Some("SECRET123".to_string());
        let app = app_with(config);

        let home = body_text(call(app.clone(), "/").await).await;
        assert!(home.contains("Primeiro"));
        assert!(home.contains("data-next-page="));
        assert!(!home.contains("SECRET123"));

        let cursor = format!("{search}?ref=MASTER&page=2");
        let uri = format!("/api/posts?cursor={}", urlencoding::encode(&cursor));
        let response = call(app, &uri).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(!body.contains("SECRET123"));
        let body: Value = serde_json::from_str(&body).expect("json");
        assert_eq!(body["results"][0]["uid"], "segundo");
        assert!(body["next_page"]
            .as_str()
            .is_some_and(|cursor| cursor.ends_with("page=3")));
    }
}
