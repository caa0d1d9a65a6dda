//! Integration tests for the EFA client (wiremock-based)

use chrono::{FixedOffset, TimeZone};
use domain::{DepartureStatus, Language, ModeFlags};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use integration_efa::{
    DepartureRequest, EfaClient, EfaConfig, EfaError, EfaPayload, EfaRequest, HttpEfaClient,
    ResponseNormalizer, StopFinderRequest, TripRequest,
};

fn config_for_mock(base_url: &str) -> EfaConfig {
    EfaConfig {
        base_url: base_url.to_string(),
        timeout_secs: 2,
        min_interval_ms: 0,
        ..EfaConfig::default()
    }
}

fn stop_finder(query: &str) -> EfaRequest {
    EfaRequest::StopFinder(StopFinderRequest {
        query: query.to_string(),
        language: Language::De,
    })
}

fn departures() -> EfaRequest {
    EfaRequest::Departures(DepartureRequest {
        stop_id: "66001234".to_string(),
        when: FixedOffset::east_opt(7200)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 13, 14, 30, 0)
            .unwrap(),
        duration_minutes: None,
        limit: 10,
        include_realtime: true,
        language: Language::De,
    })
}

fn trip() -> EfaRequest {
    EfaRequest::Trip(TripRequest {
        origin_id: "66002000".to_string(),
        destination_id: "66002001".to_string(),
        when: FixedOffset::east_opt(7200)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 13, 14, 30, 0)
            .unwrap(),
        arrive_by: false,
        max_trips: 3,
        modes: ModeFlags::default(),
        include_realtime: true,
        language: Language::It,
    })
}

const fn sample_stop_finder_json() -> &'static str {
    r#"{
        "version": "10.5.17.3",
        "systemMessages": [],
        "locations": [
            {
                "id": "66002001",
                "name": "Meran, Bahnhof",
                "type": "stop",
                "coord": [46.67251, 11.15219],
                "parent": {"id": "21021", "name": "Meran", "type": "locality"},
                "properties": {"stopId": "66002001"},
                "matchQuality": 950,
                "isBest": true,
                "productClasses": [0, 6]
            },
            {
                "id": "66002100",
                "name": "Meran, Theaterplatz",
                "type": "stop",
                "coord": [46.6707, 11.1601],
                "parent": {"id": "21021", "name": "Meran", "type": "locality"},
                "properties": {"stopId": "66002100"},
                "matchQuality": 940,
                "isBest": false,
                "productClasses": [6]
            }
        ]
    }"#
}

const fn sample_dm_json() -> &'static str {
    r#"{
        "locations": [{"id": "66001234", "name": "Neumarkt, Busbahnhof", "type": "stop"}],
        "stopEvents": [
            {
                "location": {"id": "66001234", "name": "Neumarkt, Busbahnhof", "properties": {"platform": "2"}},
                "departureTimePlanned": "2024-05-13T12:35:00Z",
                "departureTimeEstimated": "2024-05-13T12:38:00Z",
                "realtimeStatus": ["MONITORED"],
                "isRealtimeControlled": true,
                "transportation": {
                    "id": "sta:131",
                    "name": "Bus 131",
                    "disassembledName": "131",
                    "number": "131",
                    "product": {"id": 3, "class": 6, "name": "Regionalbus"},
                    "destination": {"id": "66002000", "name": "Bozen, Bahnhof"}
                }
            },
            {
                "location": {"id": "66001234", "name": "Neumarkt, Busbahnhof"},
                "departureTimePlanned": "2024-05-13T12:50:00Z",
                "realtimeStatus": ["TRIP_CANCELLED"],
                "transportation": {
                    "id": "sta:122",
                    "name": "Bus 122",
                    "number": "122",
                    "product": {"class": 6, "name": "Regionalbus"},
                    "destination": {"name": "Kaltern"}
                }
            }
        ]
    }"#
}

const fn sample_trip_json() -> &'static str {
    r#"{
        "journeys": [{
            "interchanges": 0,
            "legs": [{
                "origin": {
                    "id": "66002000", "name": "Bozen, Bahnhof",
                    "departureTimePlanned": "2024-05-13T12:32:00Z",
                    "properties": {"platform": "3"}
                },
                "destination": {
                    "id": "66002001", "name": "Meran, Bahnhof",
                    "arrivalTimePlanned": "2024-05-13T13:12:00Z"
                },
                "transportation": {
                    "disassembledName": "R",
                    "number": "R 16424",
                    "product": {"class": 0, "name": "Regionalzug"},
                    "destination": {"name": "Mals"}
                }
            }],
            "fare": {"tickets": [{"name": "Einzelfahrt", "priceBrutto": 5.5, "currency": "EUR", "person": "ADULT"}]}
        }]
    }"#
}

#[tokio::test]
async fn test_stop_finder_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/XML_STOPFINDER_REQUEST"))
        .and(query_param("name_sf", "Meran"))
        .and(query_param("outputFormat", "rapidJSON"))
        .and(query_param("type_sf", "any"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sample_stop_finder_json()))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpEfaClient::new(&config_for_mock(&server.uri())).unwrap();
    let payload = client.execute(&stop_finder("Meran")).await.unwrap();

    let EfaPayload::StopFinder(payload) = payload else {
        panic!("expected stop finder payload");
    };
    assert_eq!(payload.extra["version"], "10.5.17.3");
    let stops = ResponseNormalizer::default().stops(&payload).unwrap();
    assert_eq!(stops.len(), 2);
    assert_eq!(stops[0].id, "66002001");
    assert_eq!(stops[0].municipality.as_deref(), Some("Meran"));
    assert!(stops[0].is_best);
}

#[tokio::test]
async fn test_departures_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/XML_DM_REQUEST"))
        .and(query_param("name_dm", "66001234"))
        .and(query_param("itdDate", "20240513"))
        .and(query_param("itdTime", "14:30"))
        .and(query_param("useRealtime", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sample_dm_json()))
        .mount(&server)
        .await;

    let client = HttpEfaClient::new(&config_for_mock(&server.uri())).unwrap();
    let EfaPayload::Departures(payload) = client.execute(&departures()).await.unwrap() else {
        panic!("expected departure payload");
    };

    let board = ResponseNormalizer::default().departures(&payload).unwrap();
    assert_eq!(board.len(), 2);
    assert_eq!(board[0].delay_minutes, 3);
    assert_eq!(board[0].status, DepartureStatus::Delayed);
    assert_eq!(board[0].platform.as_deref(), Some("2"));
    assert_eq!(board[1].status, DepartureStatus::Cancelled);
}

#[tokio::test]
async fn test_trip_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/XML_TRIP_REQUEST2"))
        .and(query_param("name_origin", "66002000"))
        .and(query_param("name_destination", "66002001"))
        .and(query_param("itdTripDateTimeDepArr", "dep"))
        .and(query_param("language", "it"))
        .and(query_param("lineRestriction", "401"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sample_trip_json()))
        .mount(&server)
        .await;

    let client = HttpEfaClient::new(&config_for_mock(&server.uri())).unwrap();
    let EfaPayload::Trip(payload) = client.execute(&trip()).await.unwrap() else {
        panic!("expected trip payload");
    };

    let trips = ResponseNormalizer::default().trips(&payload).unwrap();
    assert_eq!(trips.len(), 1);
    assert_eq!(trips[0].duration_minutes, 40);
    assert_eq!(trips[0].legs[0].platform.as_deref(), Some("3"));
    assert_eq!(trips[0].fare_summary.as_ref().unwrap().name, "Einzelfahrt");
}

#[tokio::test]
async fn test_rate_limited_carries_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "30"))
        .mount(&server)
        .await;

    let client = HttpEfaClient::new(&config_for_mock(&server.uri())).unwrap();
    let err = client.execute(&stop_finder("Bozen")).await.unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(err.status(), Some(429));
    assert_eq!(err.retry_after(), Some(std::time::Duration::from_secs(30)));
}

#[tokio::test]
async fn test_server_error_is_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = HttpEfaClient::new(&config_for_mock(&server.uri())).unwrap();
    let err = client.execute(&trip()).await.unwrap_err();
    assert!(matches!(err, EfaError::Http { status: 503, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_client_error_is_not_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = HttpEfaClient::new(&config_for_mock(&server.uri())).unwrap();
    let err = client.execute(&trip()).await.unwrap_err();
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_not_found_message_is_empty_result() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/XML_STOPFINDER_REQUEST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"locations": [], "systemMessages": [{"type": "error", "module": "BROKER", "code": -8010, "text": ""}]}"#,
        ))
        .mount(&server)
        .await;

    let client = HttpEfaClient::new(&config_for_mock(&server.uri())).unwrap();
    let payload = client.execute(&stop_finder("Atlantis")).await.unwrap();
    assert_eq!(payload.result_count(), 0);
}

#[tokio::test]
async fn test_unavailable_message_is_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/XML_TRIP_REQUEST2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"journeys": [], "systemMessages": [{"type": "error", "code": "H931", "text": "timetable not available"}]}"#,
        ))
        .mount(&server)
        .await;

    let client = HttpEfaClient::new(&config_for_mock(&server.uri())).unwrap();
    let err = client.execute(&trip()).await.unwrap_err();
    assert!(matches!(err, EfaError::Api { status: 503, .. }));
    assert!(err.to_string().contains("timetable not available"));
}

#[tokio::test]
async fn test_non_json_body_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let client = HttpEfaClient::new(&config_for_mock(&server.uri())).unwrap();
    let err = client.execute(&departures()).await.unwrap_err();
    assert!(matches!(err, EfaError::Decode(_)));
}

#[tokio::test]
async fn test_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(sample_stop_finder_json())
                .set_delay(std::time::Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = EfaConfig {
        timeout_secs: 1,
        ..config_for_mock(&server.uri())
    };
    let client = HttpEfaClient::new(&config).unwrap();
    let err = client.execute(&stop_finder("Bozen")).await.unwrap_err();
    assert!(matches!(err, EfaError::Timeout { timeout_secs: 1 }));
}

#[tokio::test]
async fn test_health_check() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/XML_STOPFINDER_REQUEST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;

    let client = HttpEfaClient::new(&config_for_mock(&server.uri())).unwrap();
    assert!(client.is_healthy().await);
}
