pub mod client_requests;
pub mod http_response;
pub mod settings;
