use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use std::fmt;
use std::io::Cursor;

#[derive(Debug, Clone)]
pub enum Error {
    LoginError(String),
    ApiError(String),
    Timeout(String),
    UnexpectedApiResponse,
    /// Body that failed to parse as JSON, and the parser's reason.
    InvalidResponse(String, String),
    /// No snapshot has been fetched since startup.
    NoData,
    FormatError,
    InternalError,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::LoginError(s) => write!(f, "device rejected credentials: {}", s),
            Error::ApiError(s) => write!(f, "device API error: {}", s),
            Error::Timeout(s) => write!(f, "device did not answer in time: {}", s),
            Error::UnexpectedApiResponse => f.write_str("response without `Data` array"),
            Error::InvalidResponse(body, reason) => {
                write!(f, "invalid response ({}): {}", reason, body)
            }
            Error::NoData => f.write_str("no data received from device yet"),
            Error::FormatError => f.write_str("unable to format output"),
            Error::InternalError => f.write_str("internal error"),
        }
    }
}

impl std::error::Error for Error {}

fn html(status: Status, error: String) -> response::Result<'static> {
    Response::build()
        .status(status)
        .sized_body(error.len(), Cursor::new(error))
        .header(ContentType::new("text", "html"))
        .ok()
}

impl<'r> Responder<'r, 'static> for Error {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        match self {
            Error::NoData => {
                let error = String::from(
                    "<html><body><h3>503 Service Unavailable</h3>\
                     No data received from inverter yet</body></html>",
                );
                html(Status::ServiceUnavailable, error)
            }
            Error::LoginError(s) => {
                let error = format!(
                    "<html><body><h3>403 Forbidden</h3>\
                     Inverter rejected the configured password: <code>{}</code></body></html>",
                    s
                );
                html(Status::Forbidden, error)
            }
            Error::ApiError(_)
            | Error::Timeout(_)
            | Error::UnexpectedApiResponse
            | Error::InvalidResponse(_, _) => {
                let error = format!(
                    "<html><body><h3>502 Bad Gateway</h3>\
                     Inverter API response: <code>{}</code></body></html>",
                    self
                );
                html(Status::BadGateway, error)
            }
            _ => {
                let error = format!(
                    "<html><body><h3>Unknown exception</h3><code>{:?}</code></body></html>",
                    self
                );
                html(Status::InternalServerError, error)
            }
        }
    }
}
