use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};

use super::DeliveryError;
use crate::config::Config;

fn mail_err(err: impl std::fmt::Display) -> DeliveryError {
    DeliveryError::Mail(err.to_string())
}

/// Sends one HTML message through the configured relay. Blocking; callers
/// go through `web::block`.
pub fn send(config: &Config, to: &str, subject: &str, html: &str) -> Result<(), DeliveryError> {
    let from: Mailbox = format!("{} <{}>", config.mail_sender, config.mail_username)
        .parse()
        .map_err(mail_err)?;

    let message = Message::builder()
        .from(from)
        .to(to.parse().map_err(mail_err)?)
        .subject(subject)
        .header(ContentType::TEXT_HTML)
        .body(html.to_string())
        .map_err(mail_err)?;

    let builder = if config.mail_use_tls {
        SmtpTransport::starttls_relay(&config.mail_server).map_err(mail_err)?
    } else {
        SmtpTransport::builder_dangerous(&config.mail_server)
    };
    let mailer = builder
        .port(config.mail_port)
        .credentials(Credentials::new(
            config.mail_username.clone(),
            config.mail_password.clone(),
        ))
        .build();

    mailer.send(&message).map_err(mail_err)?;
    log::info!("sent \"{}\" to {}", subject, to);
    Ok(())
}
