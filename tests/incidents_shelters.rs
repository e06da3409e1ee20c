mod common;

use common::spawn_app;
use serde_json::json;

#[tokio::test]
async fn incident_lifecycle_and_soft_delete() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (status, levels) = app.get("/api/incidents/severity-levels", None).await;
    assert_eq!(status, 200);
    assert_eq!(levels[4], json!({ "severity": 5, "label": "Very High" }));

    let report = |severity: u8| {
        json!({
            "title": "River breach",
            "location": "North embankment",
            "severity": severity,
            "description": "Water entering low lying houses"
        })
    };
    let (status, _) = app.post("/api/incidents", None, report(3)).await;
    assert_eq!(status, 401);
    let (status, _) = app.post("/api/incidents", Some(&admin), report(6)).await;
    assert_eq!(status, 400);

    let (status, incident) = app.post("/api/incidents", Some(&admin), report(4)).await;
    assert_eq!(status, 201, "{incident}");
    assert_eq!(incident["status"], 0);
    assert_eq!(incident["severity_label"], "High");
    let id = incident["id"].as_str().expect("incident id").to_string();

    let (status, _) = app
        .post(&format!("/api/admin/incidents/{id}/complete"), Some(&admin), json!({}))
        .await;
    assert_eq!(status, 409, "pending incidents cannot complete");

    let (status, verified) = app
        .post(&format!("/api/admin/incidents/{id}/verify"), Some(&admin), json!({}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(verified["status"], 1);

    let (status, deleted) = app
        .request("DELETE", &format!("/api/admin/incidents/{id}"), Some(&admin), None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(deleted["status"], 2);

    let (_, listed) = app.get("/api/incidents", None).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(0));
    let (_, listed) = app.get("/api/incidents?status=2", None).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let (status, _) = app
        .post(&format!("/api/admin/incidents/{id}/verify"), Some(&admin), json!({}))
        .await;
    assert_eq!(status, 409);
}

#[tokio::test]
async fn bad_query_strings_get_json_errors() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (status, body) = app.get("/api/incidents?status=9", None).await;
    assert_eq!(status, 400);
    let message = body["error"].as_str().expect("json error body");
    assert!(message.contains("IncidentStatus"), "{message}");

    let (status, body) = app.get("/api/admin/tasks?status=lost", Some(&admin)).await;
    assert_eq!(status, 400);
    assert!(body["error"].is_string(), "{body}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn racing_incident_decisions_have_one_winner() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    for round in 0..5 {
        let (status, incident) = app
            .post(
                "/api/incidents",
                Some(&admin),
                json!({
                    "title": format!("Landslide {round}"),
                    "location": "Ghat road",
                    "severity": 5,
                    "description": "Road blocked"
                }),
            )
            .await;
        assert_eq!(status, 201, "{incident}");
        let id = incident["id"].as_str().expect("incident id").to_string();
        let (status, _) = app
            .post(&format!("/api/admin/incidents/{id}/verify"), Some(&admin), json!({}))
            .await;
        assert_eq!(status, 200);

        let complete_path = format!("/api/admin/incidents/{id}/complete");
        let delete_path = format!("/api/admin/incidents/{id}");
        let ((completed, _), (deleted, _)) = tokio::join!(
            app.post(&complete_path, Some(&admin), json!({})),
            app.request("DELETE", &delete_path, Some(&admin), None),
        );
        let mut statuses = [completed, deleted];
        statuses.sort();
        assert_eq!(statuses, [200, 409], "round {round}");

        let (_, stored) = app.get(&format!("/api/incidents/{id}"), Some(&admin)).await;
        let expected = if completed == 200 { 3 } else { 2 };
        assert_eq!(stored["status"], expected, "round {round}");
    }
}

#[tokio::test]
async fn shelter_occupancy_cannot_exceed_capacity() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let id = app.create_shelter(&admin, "Ward 7 School", 50).await;

    let (status, shelter) = app
        .patch(&format!("/api/admin/shelters/{id}/inmates"), Some(&admin), json!({ "inmates": 50 }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(shelter["inmates"], 50);

    let (status, _) = app
        .patch(&format!("/api/admin/shelters/{id}/inmates"), Some(&admin), json!({ "inmates": 51 }))
        .await;
    assert_eq!(status, 400);

    let (status, _) = app
        .patch(&format!("/api/admin/shelters/{id}"), Some(&admin), json!({ "total_capacity": 40 }))
        .await;
    assert_eq!(status, 400, "capacity below current occupancy");

    let (status, shelter) = app.get(&format!("/api/shelters/{id}"), None).await;
    assert_eq!(status, 200);
    assert_eq!(shelter["total_capacity"], 50);
}

#[tokio::test]
async fn shelter_duty_runs_from_assignment_to_completion() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let shelter = app.create_shelter(&admin, "Town Hall", 120).await;
    let other = app.create_shelter(&admin, "Stadium", 300).await;
    let (volunteer, token) = app.approved_volunteer(&admin, "duty@relief.test").await;

    let (status, assigned) = app
        .post(
            &format!("/api/admin/shelters/{shelter}/assign"),
            Some(&admin),
            json!({ "volunteer_id": volunteer }),
        )
        .await;
    assert_eq!(status, 200, "{assigned}");
    assert_eq!(assigned["assigned_volunteer"], volunteer.as_str());
    assert_eq!(assigned["task_status"], 1);
    assert_eq!(app.mailer.sent_to("duty@relief.test").len(), 2);

    // no double booking
    let (status, _) = app
        .post(
            &format!("/api/admin/shelters/{other}/assign"),
            Some(&admin),
            json!({ "volunteer_id": volunteer }),
        )
        .await;
    assert_eq!(status, 409);
    let (_, available) = app.get("/api/admin/volunteers/available", Some(&admin)).await;
    assert_eq!(available.as_array().map(Vec::len), Some(0));

    let (status, mine) = app.get("/api/volunteer/shelter", Some(&token)).await;
    assert_eq!(status, 200);
    assert_eq!(mine["id"], shelter.as_str());

    let (status, _) = app
        .post(&format!("/api/volunteer/shelters/{shelter}/complete"), Some(&token), json!({}))
        .await;
    assert_eq!(status, 409, "duty must be accepted first");

    let (status, accepted) = app
        .post(&format!("/api/volunteer/shelters/{shelter}/accept"), Some(&token), json!({}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(accepted["task_status"], 2);

    let (status, _) = app
        .request("DELETE", &format!("/api/admin/shelters/{shelter}"), Some(&admin), None)
        .await;
    assert_eq!(status, 400, "shelter with an active volunteer");

    let (status, done) = app
        .post(&format!("/api/volunteer/shelters/{shelter}/complete"), Some(&token), json!({}))
        .await;
    assert_eq!(status, 200);
    assert!(done.get("assigned_volunteer").is_none_or(|v| v.is_null()));

    let profile = app.volunteer(&admin, &volunteer).await;
    assert_eq!(profile["task_status"], 4);
    let (_, available) = app.get("/api/admin/volunteers/available?skill=driving", Some(&admin)).await;
    assert_eq!(available.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn volunteer_on_a_task_cannot_take_shelter_duty() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let shelter = app.create_shelter(&admin, "Riverside School", 80).await;
    let (volunteer, token) = app.approved_volunteer(&admin, "busy@relief.test").await;

    let (status, task) = app
        .post(
            "/api/admin/tasks",
            Some(&admin),
            json!({
                "title": "Ferry medicine",
                "details": {
                    "kind": "transportation",
                    "pickup_location": "District store",
                    "dropoff_location": "Riverside School",
                    "vehicle_type": "van",
                    "passenger_count": 2
                },
                "volunteer_id": volunteer
            }),
        )
        .await;
    assert_eq!(status, 201, "{task}");
    let task_id = task["id"].as_str().expect("task id").to_string();

    let assign = format!("/api/admin/shelters/{shelter}/assign");
    let (status, _) = app
        .post(&assign, Some(&admin), json!({ "volunteer_id": volunteer }))
        .await;
    assert_eq!(status, 409, "assigned task");

    let (status, _) = app
        .post(&format!("/api/volunteer/tasks/{task_id}/accept"), Some(&token), json!({}))
        .await;
    assert_eq!(status, 200);
    let (status, _) = app
        .post(&assign, Some(&admin), json!({ "volunteer_id": volunteer }))
        .await;
    assert_eq!(status, 409, "accepted task");

    let (_, stored) = app.get(&format!("/api/shelters/{shelter}"), None).await;
    assert!(stored.get("assigned_volunteer").is_none_or(|v| v.is_null()));
}

#[tokio::test]
async fn released_volunteer_frees_the_shelter() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let shelter = app.create_shelter(&admin, "Temple Hall", 60).await;
    let (volunteer, token) = app.approved_volunteer(&admin, "warden@relief.test").await;

    let release = format!("/api/admin/volunteers/{volunteer}/release");
    let (status, _) = app.post(&release, Some(&admin), json!({})).await;
    assert_eq!(status, 409, "nothing to release");

    let (status, _) = app
        .post(
            &format!("/api/admin/shelters/{shelter}/assign"),
            Some(&admin),
            json!({ "volunteer_id": volunteer }),
        )
        .await;
    assert_eq!(status, 200);
    let (status, _) = app
        .post(&format!("/api/volunteer/shelters/{shelter}/accept"), Some(&token), json!({}))
        .await;
    assert_eq!(status, 200);

    let (status, released) = app.post(&release, Some(&admin), json!({})).await;
    assert_eq!(status, 200, "{released}");
    assert_eq!(released["task_status"], 0);
    assert!(released.get("assigned_shelter").is_none_or(|v| v.is_null()));

    let (_, stored) = app.get(&format!("/api/shelters/{shelter}"), None).await;
    assert!(stored.get("assigned_volunteer").is_none_or(|v| v.is_null()));
    assert!(stored.get("task_status").is_none_or(|v| v.is_null()));
    let (status, _) = app.get("/api/volunteer/shelter", Some(&token)).await;
    assert_eq!(status, 404);
}
