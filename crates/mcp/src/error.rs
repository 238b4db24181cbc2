use rmcp::ErrorData as McpError;
use serde_json::json;
use thiserror::Error;
use yahoo::YahooError;

/// Failures a tool call can surface to the MCP caller.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid period/interval combination: {0}")]
    InvalidRange(String),
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ToolError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidRange(_) => "invalid_range",
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
            Self::InvalidInput(_) => "invalid_input",
        }
    }
}

impl From<YahooError> for ToolError {
    fn from(err: YahooError) -> Self {
        match err {
            YahooError::NotFound(message) => Self::NotFound(message),
            YahooError::InvalidRange(message) => Self::InvalidRange(message),
            other => Self::UpstreamUnavailable(other.to_string()),
        }
    }
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let data = Some(json!({ "kind": err.kind() }));
        let message = err.to_string();
        match err {
            ToolError::NotFound(_) => McpError::resource_not_found(message, data),
            ToolError::InvalidRange(_) | ToolError::InvalidInput(_) => {
                McpError::invalid_params(message, data)
            }
            ToolError::UpstreamUnavailable(_) => McpError::internal_error(message, data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::ErrorCode;

    #[test]
    fn yahoo_errors_keep_their_category() {
        let err: ToolError = YahooError::NotFound("Quote not found for symbol: ZZZZ".into()).into();
        assert!(matches!(err, ToolError::NotFound(_)));

        let err: ToolError = YahooError::InvalidRange("1m data not available".into()).into();
        assert!(matches!(err, ToolError::InvalidRange(_)));

        let err: ToolError = YahooError::EmptyResponse("chart".into()).into();
        assert!(matches!(err, ToolError::UpstreamUnavailable(_)));
    }

    #[test]
    fn mcp_error_codes() {
        let err: McpError = ToolError::NotFound("x".into()).into();
        assert_eq!(err.code, ErrorCode::RESOURCE_NOT_FOUND);
        assert_eq!(err.data, Some(json!({"kind": "not_found"})));

        let err: McpError = ToolError::InvalidInput("x".into()).into();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);

        let err: McpError = ToolError::UpstreamUnavailable("x".into()).into();
        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
    }
}
