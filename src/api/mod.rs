pub mod endpoint;
pub mod error;
pub mod response;

use crate::model::{self, RawSnapshot};
pub use error::Error;
use response::ReadRealTimeData;
use serde_json::Value;

use std::time::Duration;

const DEFAULT_SCHEME: &str = "http://";

/// Build API handle for inverter reachable at `host` (bare address or full URL).
pub fn api(host: &str, password: String, timeout: Duration) -> Result<model::Api, Error> {
    let api_url = if host.starts_with("http://") || host.starts_with("https://") {
        host.trim_end_matches('/').to_owned()
    } else {
        format!("{}{}", DEFAULT_SCHEME, host.trim_end_matches('/'))
    };

    let client = reqwest::ClientBuilder::new()
        .timeout(timeout)
        .build()
        .or(Err(Error::InternalError))?;

    Ok(model::Api {
        api_url,
        password,
        client,
    })
}

/// Map failed request or non-2xx response to Error
fn map_api_err(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        return Error::Timeout(error.to_string());
    }

    match error.status() {
        Some(http::StatusCode::UNAUTHORIZED) | Some(http::StatusCode::FORBIDDEN) => {
            Error::LoginError(error.to_string())
        }
        _ => Error::ApiError(error.to_string()),
    }
}

async fn post(
    api: &model::Api,
    endpoint: &endpoint::Endpoint,
    body: String,
) -> Result<Value, Error> {
    let url = format!("{}{}", api.api_url, endpoint);

    /* The firmware does not always label its JSON correctly, so parse the body as text */
    let response_text = api
        .client
        .post(url)
        .body(body)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(map_api_err)?
        .text()
        .await
        .map_err(|e| Error::ApiError(format!("Error reading API response: {}", e)))?;

    log::trace!("endpoint: {}, response_text: {}", endpoint, response_text);

    serde_json::from_str::<Value>(&response_text)
        .map_err(|e| Error::InvalidResponse(response_text, e.to_string()))
}

/// Read one real-time data snapshot from the inverter.
///
/// A response object without `Data` still yields a snapshot (with no registers) so the
/// `Information` metrics keep decoding. Anything that is not a JSON object is rejected.
pub async fn real_time_data(api: &model::Api) -> Result<RawSnapshot, Error> {
    let body = endpoint::request_body(endpoint::READ_REAL_TIME_DATA, &api.password);

    let value = post(api, endpoint::ROOT, body).await?;
    if !value.is_object() {
        return Err(Error::UnexpectedApiResponse);
    }

    serde_json::from_value::<ReadRealTimeData>(value)
        .or(Err(Error::UnexpectedApiResponse))
        .map(|response| {
            log::debug!(
                "received {} registers from inverter {}",
                response.data.len(),
                response.sn.as_deref().unwrap_or("(unknown sn)")
            );
            RawSnapshot::from(response)
        })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::catalog::Catalog;
    use crate::decoder::decode;
    use crate::model::{DecodedValue, InfoValue};
    use mockito::{Matcher, Server};
    use std::fs;
    use std::path::PathBuf;

    fn read_resource(filename: &str) -> String {
        let mut d = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        d.push(format!("resources/test/{}", filename));
        fs::read_to_string(d.as_path()).unwrap()
    }

    fn test_api(url: &str) -> model::Api {
        api(url, String::from("secret"), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn api_url_normalisation() {
        assert_eq!("http://192.168.1.50", test_api("192.168.1.50").api_url);
        assert_eq!("http://192.168.1.50", test_api("192.168.1.50/").api_url);
        assert_eq!("https://inverter.lan", test_api("https://inverter.lan/").api_url);
    }

    #[test]
    fn request_body() {
        assert_eq!(
            "optType=ReadRealTimeData&pwd=secret",
            endpoint::request_body(endpoint::READ_REAL_TIME_DATA, "secret")
        );
    }

    #[tokio::test]
    async fn real_time_data_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::Exact(String::from(
                "optType=ReadRealTimeData&pwd=secret",
            )))
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(read_resource("ReadRealTimeData.json"))
            .create_async()
            .await;

        let snapshot = real_time_data(&test_api(&server.url())).await.unwrap();
        assert_eq!(Some(2301), snapshot.register(0));
        assert_eq!(Some(String::from("3.008.10")), snapshot.firmware);
        assert_eq!(
            Some(&InfoValue::Text(String::from("H34A10I1234567"))),
            snapshot.info(2)
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn real_time_data_missing_data() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(read_resource("ReadRealTimeData_NoData.json"))
            .create_async()
            .await;

        let snapshot = real_time_data(&test_api(&server.url())).await.unwrap();
        assert!(snapshot.data.is_empty());

        let catalog = Catalog::builtin();
        let value = |key: &str| decode(&snapshot, catalog.get(key).unwrap());
        assert_eq!(
            Some(DecodedValue::Text(String::from("H34A10I1234567"))),
            value("inverter_sn")
        );
        assert!(value("type").is_some());
        assert_eq!(
            Some(DecodedValue::Text(String::from("3.008.10"))),
            value("firmware")
        );
        assert_eq!(None, value("acu1"));
    }

    #[tokio::test]
    async fn real_time_data_not_an_object() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body("[2301, 2302]")
            .create_async()
            .await;

        assert!(matches!(
            real_time_data(&test_api(&server.url())).await,
            Err(Error::UnexpectedApiResponse)
        ));
    }

    #[tokio::test]
    async fn real_time_data_tolerates_malformed_entries() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"Data":[2301,null,1.5],"Information":[10.0,null,"SN1"]}"#)
            .create_async()
            .await;

        let snapshot = real_time_data(&test_api(&server.url())).await.unwrap();
        let catalog = Catalog::builtin();
        let value = |key: &str| decode(&snapshot, catalog.get(key).unwrap());
        assert_eq!(Some(DecodedValue::Number(230.1)), value("acu1"));
        assert_eq!(None, value("acu2"));
        assert_eq!(None, value("acu3"));
        assert_eq!(None, value("type"));
        assert_eq!(Some(DecodedValue::Text(String::from("SN1"))), value("inverter_sn"));
    }

    #[tokio::test]
    async fn real_time_data_invalid_json() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(read_resource("invalid_json.json"))
            .create_async()
            .await;

        match real_time_data(&test_api(&server.url())).await {
            Err(Error::InvalidResponse(body, reason)) => {
                assert!(body.contains("3.008.10"));
                assert!(!reason.contains("3.008.10"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn real_time_data_status_mapping() {
        let mut server = Server::new_async().await;
        let _unauthorized = server
            .mock("POST", "/")
            .with_status(401)
            .create_async()
            .await;

        assert!(matches!(
            real_time_data(&test_api(&server.url())).await,
            Err(Error::LoginError(_))
        ));

        let mut server = Server::new_async().await;
        let _failure = server
            .mock("POST", "/")
            .with_status(500)
            .create_async()
            .await;

        assert!(matches!(
            real_time_data(&test_api(&server.url())).await,
            Err(Error::ApiError(_))
        ));
    }

    #[tokio::test]
    async fn real_time_data_unreachable() {
        let result = real_time_data(&test_api("http://127.0.0.1:1")).await;
        assert!(matches!(result, Err(Error::ApiError(_)) | Err(Error::Timeout(_))));
    }
}
