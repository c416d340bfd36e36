use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required credential: set the {var} environment variable")]
    MissingCredential { var: String },

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Errors raised by the trading node and its actor/data-client plumbing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("cannot {operation} node in state {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    #[error("no data client factory registered for '{client_id}'")]
    MissingFactory { client_id: String },

    #[error("no data client connected for venue {venue}")]
    NoClientForVenue { venue: String },

    #[error("not subscribed to {bar_type}")]
    NotSubscribed { bar_type: String },

    #[error("data client {client_id} failed: {reason}")]
    Client { client_id: String, reason: String },

    #[error("dispatch engine terminated unexpectedly: {0}")]
    EngineTerminated(String),
}

/// Errors raised by exchange adapters while talking to a venue.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("unsupported bar specification {bar_type}: {reason}")]
    UnsupportedBarType { bar_type: String, reason: String },

    #[error("instrument {instrument_id} not found on {venue}")]
    InstrumentNotFound { instrument_id: String, venue: String },

    #[error("venue rejected request {id}: code {code}: {msg}")]
    Rejected { id: u64, code: i64, msg: String },

    #[error("not connected")]
    NotConnected,
}

/// Errors produced when parsing identifiers and bar types from strings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid instrument id '{input}': {reason}")]
    InstrumentId { input: String, reason: &'static str },

    #[error("invalid bar type '{input}': {reason}")]
    BarType { input: String, reason: String },

    #[error("invalid trader id '{input}': {reason}")]
    TraderId { input: String, reason: &'static str },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::WebSocket(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credential_names_the_variable() {
        let err = Error::from(ConfigError::MissingCredential {
            var: "BINANCE_TESTNET_API_KEY".into(),
        });
        assert!(err.to_string().contains("BINANCE_TESTNET_API_KEY"));
    }

    #[test]
    fn runtime_errors_convert_transparently() {
        let err: Error = RuntimeError::NotSubscribed {
            bar_type: "X.Y-1-MINUTE-LAST-EXTERNAL".into(),
        }
        .into();
        assert_eq!(err.to_string(), "not subscribed to X.Y-1-MINUTE-LAST-EXTERNAL");
    }
}
