use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use db::{DBService, ordering::Actor};
use serde_json::{Value, json};
use server::{DeploymentImpl, routes};
use services::services::config::ReconcileConfig;
use tower::ServiceExt;
use uuid::Uuid;

async fn test_app() -> Router {
    let db = DBService::new_in_memory().await.unwrap();
    routes::router(DeploymentImpl::new(db, ReconcileConfig::default()))
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    actor: Option<&Actor>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder
            .header("x-user-id", actor.user_id.to_string())
            .header("x-user-role", actor.role.to_string());
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn id(value: &Value) -> Uuid {
    value.as_str().unwrap().parse().unwrap()
}

/// Creates a plan assigned to `client` with one week and returns (plan id, first day id).
async fn plan_with_week(app: &Router, trainer: &Actor, client: &Actor) -> (Uuid, Uuid) {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/training-plans",
        Some(trainer),
        Some(json!({ "title": "Hypertrophy", "assigned_to": client.user_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let plan_id = id(&body["data"]["id"]);

    let (status, _) = call(
        app,
        Method::POST,
        &format!("/api/training-plans/{plan_id}/weeks"),
        Some(trainer),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, tree) = call(
        app,
        Method::GET,
        &format!("/api/training-plans/{plan_id}"),
        Some(client),
        None,
    )
    .await;
    assert_eq!(tree["data"]["weeks"][0]["days"].as_array().unwrap().len(), 7);
    (plan_id, id(&tree["data"]["weeks"][0]["days"][0]["id"]))
}

async fn add_exercise(app: &Router, trainer: &Actor, day_id: Uuid, name: &str) -> Uuid {
    let (status, body) = call(
        app,
        Method::POST,
        &format!("/api/days/{day_id}/exercises"),
        Some(trainer),
        Some(json!({ "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    id(&body["data"])
}

fn order_of(body: &Value) -> Vec<(Uuid, i64)> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| (id(&row["id"]), row["position"].as_i64().unwrap()))
        .collect()
}

#[tokio::test]
async fn test_move_then_delete_over_http() {
    let app = test_app().await;
    let trainer = Actor::trainer(Uuid::new_v4());
    let client = Actor::client(Uuid::new_v4());
    let (_, day) = plan_with_week(&app, &trainer, &client).await;

    let a = add_exercise(&app, &trainer, day, "Bench press").await;
    let b = add_exercise(&app, &trainer, day, "Row").await;
    let c = add_exercise(&app, &trainer, day, "Curl").await;

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/exercises/{c}/move"),
        Some(&trainer),
        Some(json!({ "new_position": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call(&app, Method::GET, &format!("/api/days/{day}/exercises"), Some(&trainer), None).await;
    assert_eq!(order_of(&body), vec![(c, 1), (a, 2), (b, 3)]);

    let (status, _) = call(&app, Method::DELETE, &format!("/api/exercises/{a}"), Some(&trainer), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call(&app, Method::GET, &format!("/api/days/{day}/exercises"), Some(&trainer), None).await;
    assert_eq!(order_of(&body), vec![(c, 1), (b, 2)]);

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/days/{day}/exercises?position=1"),
        Some(&trainer),
        Some(json!({ "name": "Dip" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let d = id(&body["data"]);

    let (_, body) = call(&app, Method::GET, &format!("/api/days/{day}/exercises"), Some(&client), None).await;
    assert_eq!(order_of(&body), vec![(d, 1), (c, 2), (b, 3)]);
}

#[tokio::test]
async fn test_listing_requires_a_caller_who_can_see_the_plan() {
    let app = test_app().await;
    let trainer = Actor::trainer(Uuid::new_v4());
    let client = Actor::client(Uuid::new_v4());
    let stranger = Actor::trainer(Uuid::new_v4());
    let (_, day) = plan_with_week(&app, &trainer, &client).await;
    let squat = add_exercise(&app, &trainer, day, "Squat").await;
    let uri = format!("/api/days/{day}/exercises");

    let (status, body) = call(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));

    let (status, _) = call(&app, Method::GET, &uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(
        &app,
        Method::GET,
        &format!("/api/days/{}/exercises", Uuid::new_v4()),
        Some(&trainer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    for viewer in [&trainer, &client] {
        let (status, body) = call(&app, Method::GET, &uri, Some(viewer), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(order_of(&body), vec![(squat, 1)]);
    }
}

#[tokio::test]
async fn test_error_statuses() {
    let app = test_app().await;
    let trainer = Actor::trainer(Uuid::new_v4());
    let client = Actor::client(Uuid::new_v4());
    let (_, day) = plan_with_week(&app, &trainer, &client).await;
    let squat = add_exercise(&app, &trainer, day, "Squat").await;
    let uri = format!("/api/days/{day}/exercises");

    let (status, body) = call(&app, Method::POST, &uri, None, Some(json!({ "name": "Lunge" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));

    let (status, _) = call(&app, Method::POST, &uri, Some(&client), Some(json!({ "name": "Lunge" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("{uri}?position=0"),
        Some(&trainer),
        Some(json!({ "name": "Lunge" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("position"));

    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/api/exercises/{}", Uuid::new_v4()),
        Some(&trainer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Completing the only set completes the whole plan and locks it
    let (_, body) = call(
        &app,
        Method::POST,
        &format!("/api/exercises/{squat}/sets"),
        Some(&trainer),
        Some(json!({ "reps": 5, "weight_kg": 100.0 })),
    )
    .await;
    let set = id(&body["data"]);
    let (status, body) = call(&app, Method::POST, &format!("/api/sets/{set}/complete"), Some(&client), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["plan"], json!(true));

    let (status, body) = call(&app, Method::POST, &uri, Some(&trainer), Some(json!({ "name": "Lunge" }))).await;
    assert_eq!(status, StatusCode::LOCKED);
    assert_eq!(body["message"], json!("cannot edit a completed item"));
}

#[tokio::test]
async fn test_meal_reorder_returns_server_order() {
    let app = test_app().await;
    let trainer = Actor::trainer(Uuid::new_v4());

    let (_, body) = call(
        &app,
        Method::POST,
        "/api/nutrition-plans",
        Some(&trainer),
        Some(json!({ "title": "Lean bulk", "days": 2 })),
    )
    .await;
    let plan_id = id(&body["data"]["id"]);
    let (_, tree) = call(
        &app,
        Method::GET,
        &format!("/api/nutrition-plans/{plan_id}"),
        Some(&trainer),
        None,
    )
    .await;
    assert_eq!(tree["data"]["days"].as_array().unwrap().len(), 2);
    let day = id(&tree["data"]["days"][0]["id"]);

    let mut meals = Vec::new();
    for name in ["Oats", "Chicken and rice", "Salmon"] {
        let (_, body) = call(
            &app,
            Method::POST,
            &format!("/api/nutrition-days/{day}/meals"),
            Some(&trainer),
            Some(json!({ "name": name, "calories": 600 })),
        )
        .await;
        meals.push(id(&body["data"]));
    }

    let order_uri = format!("/api/nutrition-days/{day}/meals/order");
    let (status, body) = call(
        &app,
        Method::PUT,
        &order_uri,
        Some(&trainer),
        Some(json!({ "ordered_ids": [meals[2], meals[0], meals[1]] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order_of(&body), vec![(meals[2], 0), (meals[0], 1), (meals[1], 2)]);

    let (status, _) = call(
        &app,
        Method::PUT,
        &order_uri,
        Some(&trainer),
        Some(json!({ "ordered_ids": [meals[2], meals[0]] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reconcile_settings() {
    let app = test_app().await;
    let (status, body) = call(&app, Method::GET, "/api/config/reconcile", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!({ "meal_debounce_ms": 3000, "default_debounce_ms": 750 })
    );
}
