use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use catfetch_app::{Control, Page};
use catfetch_common::CatfetchError;
use catfetch_http::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use catfetch_http::{
    Dispatch, FetchedResponse, HttpClient, HttpError, MediaType, RequestDescriptor, StatusCode,
};
use catfetch_render::{ContentMatch, Node};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CAT_JSON: &str = r#"{"name":"Tom","age":3}"#;
const CAT_XML: &str = "<cat><name>Tom</name><age>3</age></cat>";

fn headings(page: &Page) -> Vec<String> {
    page.content()
        .snapshot()
        .iter()
        .map(|g| g.nodes()[1].text().unwrap_or_default().to_string())
        .collect()
}

async fn mount_cat(server: &MockServer, accept: &'static str, status: u16, body: &'static str) {
    Mock::given(method("GET"))
        .and(path("/cats"))
        .and(header("accept", accept))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_raw(body, accept),
        )
        .mount(server)
        .await;
}

fn http_page(server: &MockServer) -> Page {
    let client = HttpClient::new(&server.uri()).unwrap();
    Page::mount(Arc::new(client), "/cats", ContentMatch::Exact).unwrap()
}

#[tokio::test]
async fn both_controls_render_the_same_cat() {
    let server = MockServer::start().await;
    mount_cat(&server, "application/json", 200, CAT_JSON).await;
    mount_cat(&server, "text/xml", 200, CAT_XML).await;
    let page = http_page(&server);

    let outcomes = page
        .click_through(&[Control::GetCatsJson, Control::GetCatsXml], true)
        .await;
    assert!(outcomes.iter().all(Result::is_ok));

    let groups = page.content().snapshot();
    assert_eq!(groups.len(), 2);
    for (group, ct, body) in [
        (&groups[0], "application/json", CAT_JSON),
        (&groups[1], "text/xml", CAT_XML),
    ] {
        assert_eq!(
            group.nodes(),
            &[
                Node::Divider,
                Node::Heading("Name: Tom".into()),
                Node::Paragraph("Age: 3".into()),
                Node::SubHeading(ct.into()),
                Node::Paragraph(body.into()),
            ]
        );
    }
}

#[tokio::test]
async fn controls_send_their_accept_to_the_same_path() {
    let server = MockServer::start().await;
    mount_cat(&server, "application/json", 200, CAT_JSON).await;
    mount_cat(&server, "text/xml", 200, CAT_XML).await;
    let page = http_page(&server);

    page.activate(Control::GetCatsJson).await.unwrap().unwrap();
    page.activate(Control::GetCatsXml).await.unwrap().unwrap();

    let seen = server.received_requests().await.unwrap();
    let pairs: Vec<(String, String)> = seen
        .iter()
        .map(|r| {
            (
                r.url.path().to_string(),
                r.headers.get("accept").unwrap().to_str().unwrap().to_string(),
            )
        })
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("/cats".to_string(), "application/json".to_string()),
            ("/cats".to_string(), "text/xml".to_string()),
        ]
    );
}

#[tokio::test]
async fn malformed_json_fails_only_its_own_cycle() {
    let server = MockServer::start().await;
    mount_cat(&server, "application/json", 200, "{\"name\":").await;
    mount_cat(&server, "text/xml", 200, CAT_XML).await;
    let page = http_page(&server);

    let outcomes = page
        .click_through(
            &[Control::GetCatsJson, Control::GetCatsXml, Control::GetCatsXml],
            false,
        )
        .await;

    assert!(matches!(outcomes[0], Err(CatfetchError::Render(_))));
    assert!(outcomes[1].is_ok());
    assert!(outcomes[2].is_ok());
    assert_eq!(headings(&page), vec!["Name: Tom", "Name: Tom"]);
}

#[tokio::test]
async fn error_status_with_known_type_still_renders() {
    let server = MockServer::start().await;
    mount_cat(&server, "application/json", 503, r#"{"name":"Busy","age":0}"#).await;
    let page = http_page(&server);

    page.activate(Control::GetCatsJson).await.unwrap().unwrap();
    assert_eq!(headings(&page), vec!["Name: Busy"]);
}

#[tokio::test]
async fn charset_parameter_only_matches_by_essence() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cats"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(CAT_JSON, "application/json; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let exact = http_page(&server);
    exact.activate(Control::GetCatsJson).await.unwrap().unwrap();
    assert_eq!(headings(&exact), vec!["Name: "]);

    let client = HttpClient::new(&server.uri()).unwrap();
    let essence = Page::mount(Arc::new(client), "/cats", ContentMatch::Essence).unwrap();
    essence.activate(Control::GetCatsJson).await.unwrap().unwrap();
    assert_eq!(headings(&essence), vec!["Name: Tom"]);
    assert_eq!(
        essence.content().snapshot()[0].nodes()[3],
        Node::SubHeading("application/json; charset=utf-8".into())
    );
}

// ---- scripted transport -------------------------------------------------

/// Answers JSON requests after `json_delay`, XML requests immediately, and
/// never answers (or fails) depending on the behaviour chosen.
struct Scripted {
    json: Behaviour,
    json_delay: Duration,
}

enum Behaviour {
    Answer,
    Hang,
    Refuse,
}

#[async_trait]
impl Dispatch for Scripted {
    async fn issue_request(&self, req: &RequestDescriptor) -> Result<FetchedResponse, HttpError> {
        let (ct, body) = match req.accept() {
            MediaType::Json => {
                match self.json {
                    Behaviour::Answer => {}
                    Behaviour::Hang => futures::future::pending::<()>().await,
                    Behaviour::Refuse => {
                        return Err(HttpError::Network("connection refused".into()));
                    }
                }
                tokio::time::sleep(self.json_delay).await;
                ("application/json", r#"{"name":"Json","age":1}"#)
            }
            MediaType::Xml => ("text/xml", "<cat><name>Xml</name><age>2</age></cat>"),
            MediaType::Other(_) => ("text/plain", "?"),
        };
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(ct));
        Ok(FetchedResponse::new(StatusCode::OK, headers, body))
    }
}

fn scripted_page(json: Behaviour, json_delay: Duration) -> Page {
    let dispatch = Scripted { json, json_delay };
    Page::mount(Arc::new(dispatch), "/cats", ContentMatch::Exact).unwrap()
}

#[tokio::test]
async fn groups_land_in_resolution_order() {
    let page = scripted_page(Behaviour::Answer, Duration::from_millis(200));

    let outcomes = page
        .click_through(&[Control::GetCatsJson, Control::GetCatsXml], false)
        .await;
    assert!(outcomes.iter().all(Result::is_ok));

    // JSON was clicked first but resolved last.
    assert_eq!(headings(&page), vec!["Name: Xml", "Name: Json"]);
}

#[tokio::test]
async fn sequential_clicks_keep_click_order() {
    let page = scripted_page(Behaviour::Answer, Duration::from_millis(50));

    page.click_through(&[Control::GetCatsJson, Control::GetCatsXml], true)
        .await;

    assert_eq!(headings(&page), vec!["Name: Json", "Name: Xml"]);
}

#[tokio::test]
async fn network_failure_renders_nothing_for_that_cycle() {
    let page = scripted_page(Behaviour::Refuse, Duration::ZERO);

    let outcomes = page
        .click_through(&[Control::GetCatsJson, Control::GetCatsXml], false)
        .await;

    assert!(matches!(outcomes[0], Err(CatfetchError::Dispatch(_))));
    assert!(outcomes[1].is_ok());
    assert_eq!(headings(&page), vec!["Name: Xml"]);
}

#[tokio::test]
async fn unanswered_requests_wait_without_blocking_others() {
    let page = scripted_page(Behaviour::Hang, Duration::ZERO);

    let hung = page.activate(Control::GetCatsJson);
    page.activate(Control::GetCatsXml).await.unwrap().unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!hung.is_finished());
    assert_eq!(headings(&page), vec!["Name: Xml"]);

    hung.abort();
}

#[test]
fn empty_path_is_rejected_at_mount() {
    let dispatch = Scripted {
        json: Behaviour::Answer,
        json_delay: Duration::ZERO,
    };
    let result = Page::mount(Arc::new(dispatch), "", ContentMatch::Exact);
    assert!(matches!(result, Err(CatfetchError::Config(_))));
}
