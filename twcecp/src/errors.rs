use thiserror::Error;

#[derive(Debug, Error)]
pub enum EcpError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] ureq::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid ECP URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Missing required device-info element: {0}")]
    MissingField(&'static str),

    #[error("Device at {0} is not a Roku (vendor-name: {1})")]
    NotARoku(String, String),
}

impl EcpError {
    /// Vrai pour les échecs de transport (connexion, timeout, I/O),
    /// faux pour les erreurs de protocole (statut HTTP, XML, vendor).
    pub fn is_transport(&self) -> bool {
        match self {
            EcpError::Http(ureq::Error::StatusCode(_)) => false,
            EcpError::Http(_) | EcpError::Io(_) => true,
            _ => false,
        }
    }
}
