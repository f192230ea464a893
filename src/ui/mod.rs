pub mod api_client;
pub mod registration;
pub mod registration_view;
