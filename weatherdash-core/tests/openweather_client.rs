//! Integration tests for OpenWeatherClient using wiremock.

use std::sync::Arc;

use weatherdash_core::{
    Coordinates, Endpoints, FetchError, Locator, LookupOutcome, LookupRequest, OpenWeatherClient,
    Orchestrator, Preferences, UnitSystem, WeatherSource, client::fetch_snapshot,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> OpenWeatherClient {
    OpenWeatherClient::with_endpoints(
        "TEST_KEY".to_string(),
        Endpoints {
            base: format!("{}/data/2.5", server.uri()),
            geo: format!("{}/geo/1.0", server.uri()),
        },
    )
}

fn current_body(name: &str) -> serde_json::Value {
    serde_json::json!({
        "coord": { "lon": -0.1257, "lat": 51.5085 },
        "weather": [{ "id": 500, "main": "Rain", "description": "light rain", "icon": "10d" }],
        "main": { "temp": 11.2, "feels_like": 10.4, "pressure": 1008, "humidity": 81 },
        "visibility": 9000,
        "wind": { "speed": 5.1, "deg": 230 },
        "clouds": { "all": 75 },
        "dt": 1700000000,
        "sys": { "country": "GB", "sunrise": 1699946000, "sunset": 1699978000 },
        "timezone": 0,
        "name": name,
        "cod": 200
    })
}

fn forecast_body(samples: usize) -> serde_json::Value {
    let list: Vec<serde_json::Value> = (0..samples)
        .map(|i| {
            serde_json::json!({
                "dt": 1700000000 + (i as i64) * 10800,
                "main": { "temp": 10.0 + i as f64, "feels_like": 9.0, "pressure": 1010, "humidity": 70 },
                "weather": [{ "id": 803, "main": "Clouds", "description": "broken clouds", "icon": "04d" }],
                "pop": 0.3
            })
        })
        .collect();

    serde_json::json!({ "cod": "200", "cnt": samples, "list": list, "city": { "name": "London", "country": "GB" } })
}

fn air_body() -> serde_json::Value {
    serde_json::json!({
        "coord": { "lon": -0.1257, "lat": 51.5085 },
        "list": [{
            "main": { "aqi": 2 },
            "components": { "co": 230.3, "no": 0.1, "no2": 12.5, "o3": 55.1, "so2": 2.3, "pm2_5": 4.1, "pm10": 6.8, "nh3": 0.9 },
            "dt": 1700000000
        }]
    })
}

async fn mount_ok(server: &MockServer, endpoint: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn current_by_city_sends_locator_units_and_key() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "London"))
        .and(query_param("units", "imperial"))
        .and(query_param("appid", "TEST_KEY"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body("London")))
        .expect(1)
        .mount(&server)
        .await;

    let reading = client_for(&server)
        .current(&Locator::City("London".into()), UnitSystem::Imperial)
        .await
        .unwrap();

    assert_eq!(reading.location.name, "London");
    assert_eq!(reading.location.country, "GB");
    assert_eq!(reading.location.coords, Coordinates::new(51.5085, -0.1257));
    assert_eq!(reading.conditions.humidity_pct, 81);
    assert_eq!(reading.conditions.pressure_hpa, 1008.0);
    assert_eq!(reading.conditions.wind_deg, 230.0);
    assert_eq!(reading.conditions.visibility_m, Some(9000.0));
    assert_eq!(reading.conditions.cloud_cover_pct, 75);
    assert_eq!(reading.conditions.condition.icon, "10d");
    assert_eq!(reading.conditions.sunrise, 1699946000);
}

#[tokio::test]
async fn current_by_coordinates_uses_lat_lon() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("lat", "51.5"))
        .and(query_param("lon", "-0.12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body("City of London")))
        .expect(1)
        .mount(&server)
        .await;

    let reading = client_for(&server)
        .current(&Locator::Coords(Coordinates::new(51.5, -0.12)), UnitSystem::Metric)
        .await
        .unwrap();

    assert_eq!(reading.location.name, "City of London");
}

#[tokio::test]
async fn not_found_short_circuits_the_lookup() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(serde_json::json!({ "cod": "404", "message": "city not found" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    for endpoint in ["/data/2.5/forecast", "/data/2.5/air_pollution", "/data/2.5/onecall"] {
        Mock::given(method("GET"))
            .and(path(endpoint))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
    }

    let client = client_for(&server);
    let err = fetch_snapshot(&client, &Locator::City("Zzznotacity".into()), UnitSystem::Metric)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::NotFound), "unexpected error: {err:?}");
}

#[tokio::test]
async fn server_error_is_a_generic_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .current(&Locator::City("London".into()), UnitSystem::Metric)
        .await
        .unwrap_err();

    match err {
        FetchError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_json_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"name\": 42"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .current(&Locator::City("London".into()), UnitSystem::Metric)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Decode { what: "current weather", .. }));
}

#[tokio::test]
async fn snapshot_survives_failing_alerts_endpoint() {
    let server = MockServer::start().await;
    mount_ok(&server, "/data/2.5/weather", current_body("London")).await;
    mount_ok(&server, "/data/2.5/forecast", forecast_body(40)).await;
    mount_ok(&server, "/data/2.5/air_pollution", air_body()).await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/onecall"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({ "cod": 401 })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let snapshot = fetch_snapshot(&client, &Locator::City("London".into()), UnitSystem::Metric)
        .await
        .unwrap();

    assert!(snapshot.alerts.is_empty());
    assert_eq!(snapshot.forecast.len(), 40);
    assert_eq!(snapshot.forecast[0].precipitation_probability, 0.3);

    let aq = snapshot.air_quality.expect("air quality");
    assert_eq!(aq.aqi, 2);
    assert_eq!(aq.pollutants.pm2_5, 4.1);
    assert_eq!(aq.pollutants.no2, 12.5);
}

#[tokio::test]
async fn air_quality_and_alerts_query_resolved_coordinates() {
    let server = MockServer::start().await;
    mount_ok(&server, "/data/2.5/weather", current_body("London")).await;
    mount_ok(&server, "/data/2.5/forecast", forecast_body(8)).await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/air_pollution"))
        .and(query_param("lat", "51.5085"))
        .and(query_param("lon", "-0.1257"))
        .respond_with(ResponseTemplate::new(200).set_body_json(air_body()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/onecall"))
        .and(query_param("lat", "51.5085"))
        .and(query_param("exclude", "current,minutely,hourly,daily"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "lat": 51.5085,
            "lon": -0.1257,
            "alerts": [{
                "sender_name": "Met Office",
                "event": "Yellow wind warning",
                "start": 1700000000,
                "end": 1700040000,
                "description": "Strong winds"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let snapshot = fetch_snapshot(&client, &Locator::City("London".into()), UnitSystem::Metric)
        .await
        .unwrap();

    assert_eq!(snapshot.alerts.len(), 1);
    assert_eq!(snapshot.alerts[0].event, "Yellow wind warning");
    assert_eq!(snapshot.alerts[0].sender.as_deref(), Some("Met Office"));
}

#[tokio::test]
async fn empty_air_quality_list_means_no_sample() {
    let server = MockServer::start().await;
    mount_ok(&server, "/data/2.5/air_pollution", serde_json::json!({ "list": [] })).await;

    let reading = client_for(&server).air_quality(Coordinates::new(1.0, 2.0)).await.unwrap();
    assert!(reading.is_none());
}

#[tokio::test]
async fn reverse_geocode_returns_nearest_place() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/reverse"))
        .and(query_param("lat", "48.85"))
        .and(query_param("lon", "2.35"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "name": "Paris", "lat": 48.8589, "lon": 2.32, "country": "FR", "state": "Ile-de-France" }
        ])))
        .mount(&server)
        .await;

    let place = client_for(&server)
        .reverse_geocode(Coordinates::new(48.85, 2.35))
        .await
        .unwrap()
        .expect("a place");

    assert_eq!(place.name, "Paris");
    assert_eq!(place.country, "FR");
}

#[tokio::test]
async fn orchestrated_lookup_against_mock_server() {
    let server = MockServer::start().await;
    mount_ok(&server, "/data/2.5/weather", current_body("London")).await;
    mount_ok(&server, "/data/2.5/forecast", forecast_body(40)).await;
    mount_ok(&server, "/data/2.5/air_pollution", air_body()).await;
    mount_ok(&server, "/data/2.5/onecall", serde_json::json!({ "lat": 51.5, "lon": -0.1 })).await;

    let orch = Orchestrator::new(
        Arc::new(client_for(&server)),
        Preferences::in_memory(),
        UnitSystem::Metric,
    );

    let outcome = orch.lookup(LookupRequest::city("London")).await;
    let LookupOutcome::Success(report) = outcome else {
        panic!("expected success, got {outcome:?}");
    };

    let daily: Vec<i64> = report.daily.iter().map(|e| e.timestamp).collect();
    let expected: Vec<i64> = [0, 8, 16, 24, 32].iter().map(|i| 1700000000 + i * 10800).collect();
    assert_eq!(daily, expected);
    assert_eq!(report.hourly.len(), 8);
    assert!(report.alerts.is_empty());
    assert_eq!(orch.preferences().history().entries(), ["London"]);
}
