use axum::Router;
use axum::http::StatusCode;
use axum_test::TestServer;
use engine::filter::parse;
use entities::{Addendum, User};
use entity_routes::routes;
use entity_routes::state::EntityAppState;
use entity_service::{EntityService, ForeignKeyRelation, RelatedEntityResolver, Relation};
use repositories::InMemoryRepo;
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use std::sync::Arc;

fn user(id: i64, username: &str) -> User {
    User {
        id,
        ..User::new(username)
    }
}

#[fixture]
fn server() -> TestServer {
    let addenda = EntityService::new(Arc::new(InMemoryRepo::with_entities([
        Addendum {
            id: 10,
            ..Addendum::new("Color", "blue").on("User", 1)
        },
        Addendum {
            id: 11,
            ..Addendum::new("Color", "green").on("User", 2)
        },
    ])));
    let relation = ForeignKeyRelation::new(addenda.clone(), "EntityId")
        .unwrap()
        .with_filter(parse("Entity eq 'User'").unwrap());
    let users = EntityService::with_resolver(
        Arc::new(InMemoryRepo::with_entities([
            user(1, "alpha"),
            user(2, "bravo"),
            user(3, "charlie"),
        ])),
        Arc::new(RelatedEntityResolver::default().with(Relation::new("Addendum", relation))),
    );

    let router = Router::new()
        .merge(routes::build(EntityAppState::new("/users", users)))
        .merge(routes::build(EntityAppState::new("/addenda", addenda)));
    TestServer::new(router).unwrap()
}

fn ids(body: &Value) -> Vec<i64> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|e| e["Id"].as_i64().unwrap())
        .collect()
}

#[rstest]
#[tokio::test]
async fn list_streams_envelopes(server: TestServer) {
    let response = server.get("/users").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(vec![1, 2, 3], ids(&body));
    assert_eq!("/users/2", body[1]["Uri"]);
    assert_eq!("bravo", body[1]["Object"]["Username"]);
    assert!(body[1].get("RelatedEntityCollection").is_none());
}

#[rstest]
#[case(&[("$filter", "Id ge 2")], vec![2, 3])]
#[case(&[("$top", "1"), ("$skip", "1")], vec![2])]
#[case(&[("$filter", "Username contains 'a'"), ("$top", "-1")], vec![1, 2, 3])]
#[tokio::test]
async fn list_honours_query_parameters(
    server: TestServer,
    #[case] params: &[(&str, &str)],
    #[case] expected: Vec<i64>,
) {
    let mut request = server.get("/users");
    for (key, value) in params {
        request = request.add_query_param(key, value);
    }
    let body: Value = request.await.json();
    assert_eq!(expected, ids(&body));
}

#[rstest]
#[case("Shoe eq 1".to_owned())]
#[case("Id eq 'one'".to_owned())]
#[case("Id eq".to_owned())]
#[case("(".repeat(8000) + "Id eq 1")]
#[tokio::test]
async fn bad_filter_is_a_bad_request(server: TestServer, #[case] filter: String) {
    let response = server
        .get("/users")
        .add_query_param("$filter", &filter)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>()["message"].is_string());
}

#[rstest]
#[tokio::test]
async fn expand_attaches_related_collections(server: TestServer) {
    let body: Value = server
        .get("/users/1")
        .add_query_param("$expand", "Addendum")
        .await
        .json();

    assert_eq!(
        json!([{
            "Count": 1,
            "RelatedEntity": "Addendum",
            "RelatedEntities": [{
                "Id": "10",
                "Object": {
                    "Id": 10,
                    "CreateDate": "0001-01-01T00:00:00",
                    "CreatedBy": 0,
                    "Entity": "User",
                    "EntityId": "1",
                    "LastUpdated": null,
                    "LastUpdatedBy": null,
                    "Property": "Color",
                    "Value": "blue"
                },
                "Uri": null
            }]
        }]),
        body["RelatedEntityCollection"]
    );
}

#[rstest]
#[tokio::test]
async fn single_envelope_keeps_field_order(server: TestServer) {
    let text = server.get("/addenda/10").await.text();
    assert_eq!(
        r#"{"Id":10,"Object":{"Id":10,"CreateDate":"0001-01-01T00:00:00","CreatedBy":0,"Entity":"User","EntityId":"1","LastUpdated":null,"LastUpdatedBy":null,"Property":"Color","Value":"blue"},"Uri":"/addenda/10"}"#,
        text
    );
}

#[rstest]
#[tokio::test]
async fn get_by_id_or_alternate_key(server: TestServer) {
    let by_id: Value = server.get("/users/3").await.json();
    assert_eq!("charlie", by_id["Object"]["Username"]);

    let by_key: Value = server.get("/users/charlie").await.json();
    assert_eq!(3, by_key["Id"]);

    server.get("/users/nobody").await.assert_status_not_found();
}

#[rstest]
#[tokio::test]
async fn count_ids_and_search(server: TestServer) {
    assert_eq!(3, server.get("/users/count").await.json::<u64>());

    let by_ids: Value = server.post("/users/ids").json(&json!([3, 1, 42])).await.json();
    let mut found = ids(&by_ids);
    found.sort();
    assert_eq!(vec![1, 3], found);

    let by_property: Value = server
        .post("/users/by/Username")
        .json(&json!(["alpha", "charlie"]))
        .await
        .json();
    assert_eq!(vec![1, 3], ids(&by_property));

    let searched: Value = server.get("/users/search/HAR").await.json();
    assert_eq!(vec![3], ids(&searched));
}

#[rstest]
#[tokio::test]
async fn create_then_patch_then_replace(server: TestServer) {
    let response = server
        .post("/users")
        .json(&json!([{ "Username": "delta", "Active": true }]))
        .await;
    response.assert_status(StatusCode::CREATED);
    let created: Value = response.json();
    assert_eq!(vec![4], ids(&created));

    let patched: Value = server
        .patch("/users/4")
        .json(&json!({
            "Entity": { "Id": 99, "Username": "ignored", "ExternalAuth": true },
            "ChangedProperties": ["ExternalAuth"]
        }))
        .await
        .json();
    assert_eq!(4, patched["Id"]);
    assert_eq!("delta", patched["Object"]["Username"]);
    assert_eq!(true, patched["Object"]["ExternalAuth"]);

    let replaced: Value = server
        .put("/users/4")
        .json(&json!({ "Username": "echo" }))
        .await
        .json();
    assert_eq!("echo", replaced["Object"]["Username"]);
    assert_eq!(false, replaced["Object"]["ExternalAuth"]);
    assert_eq!(false, replaced["Object"]["Active"]);
}

#[rstest]
#[tokio::test]
async fn create_requires_entities(server: TestServer) {
    server
        .post("/users")
        .json(&json!([]))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[rstest]
#[tokio::test]
async fn patch_missing_entity_is_not_found(server: TestServer) {
    server
        .patch("/users/99")
        .json(&json!({ "Entity": { "Username": "x" }, "ChangedProperties": ["Username"] }))
        .await
        .assert_status_not_found();
}

#[rstest]
#[tokio::test]
async fn patch_unknown_property_is_a_bad_request(server: TestServer) {
    server
        .patch("/users/1")
        .json(&json!({ "Entity": {}, "ChangedProperties": ["Shoe"] }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[rstest]
#[tokio::test]
async fn property_read_and_write(server: TestServer) {
    let value: Option<String> = server.get("/users/2/Username").await.json();
    assert_eq!(Some("bravo".to_owned()), value);

    let value: Option<String> = server.put("/users/2/Username").text("bravo2").await.json();
    assert_eq!(Some("bravo2".to_owned()), value);

    let value: Option<String> = server.get("/users/2/OrganizationId").await.json();
    assert_eq!(None, value);

    server
        .put("/users/2/CreatedBy")
        .text("many")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[rstest]
#[tokio::test]
async fn delete_reports_outcome(server: TestServer) {
    assert!(server.delete("/users/1").await.json::<bool>());
    assert!(!server.delete("/users/1").await.json::<bool>());
    server.get("/users/1").await.assert_status_not_found();
}
