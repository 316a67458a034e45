mod credentials_port;
mod http_port;
mod realtime_port;
mod token_store_port;

pub use credentials_port::AccessTokenProvider;
pub use http_port::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
pub use realtime_port::{InboundMessage, RealtimeEvent};
#[cfg(test)]
pub use token_store_port::MockTokenStore;
pub use token_store_port::{TokenSlot, TokenStore};

#[cfg(test)]
pub mod mocks {
    pub use super::credentials_port::mock::StaticTokenProvider;
    pub use super::http_port::mock::RoutedTransport;
}
