pub mod ftp;
pub mod mail;

use std::fmt::Display;
use std::sync::Arc;

use crate::config::Config;

/// Why an outbound delivery failed; logged in full, summarized in a flash.
#[derive(Debug)]
pub enum DeliveryError {
    Mail(String),
    Transfer(String),
}

impl Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryError::Mail(reason) => write!(f, "mail delivery failed: {}", reason),
            DeliveryError::Transfer(reason) => write!(f, "file transfer failed: {}", reason),
        }
    }
}

impl std::error::Error for DeliveryError {}

/// Outbound side effects behind one seam, so request handlers never talk
/// to SMTP or FTP directly and tests can count what went out.
pub trait Delivery: Send + Sync {
    fn send_mail(&self, to: &str, subject: &str, html: &str) -> Result<(), DeliveryError>;
    fn store_file(&self, filename: &str, contents: &[u8]) -> Result<(), DeliveryError>;
}

/// Production delivery: SMTP for mail, FTP for recommendation files.
pub struct SmtpFtpDelivery {
    config: Arc<Config>,
}

impl SmtpFtpDelivery {
    pub fn new(config: Arc<Config>) -> SmtpFtpDelivery {
        SmtpFtpDelivery { config }
    }
}

impl Delivery for SmtpFtpDelivery {
    fn send_mail(&self, to: &str, subject: &str, html: &str) -> Result<(), DeliveryError> {
        mail::send(&self.config, to, subject, html)
    }

    fn store_file(&self, filename: &str, contents: &[u8]) -> Result<(), DeliveryError> {
        ftp::upload(&self.config, filename, contents)
    }
}

/// Test double that records instead of delivering.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingDelivery {
    pub mails: std::sync::Mutex<Vec<(String, String, String)>>,
    pub files: std::sync::Mutex<Vec<(String, Vec<u8>)>>,
}

#[cfg(test)]
impl Delivery for RecordingDelivery {
    fn send_mail(&self, to: &str, subject: &str, html: &str) -> Result<(), DeliveryError> {
        self.mails.lock().unwrap().push((
            to.to_string(),
            subject.to_string(),
            html.to_string(),
        ));
        Ok(())
    }

    fn store_file(&self, filename: &str, contents: &[u8]) -> Result<(), DeliveryError> {
        self.files
            .lock()
            .unwrap()
            .push((filename.to_string(), contents.to_vec()));
        Ok(())
    }
}
