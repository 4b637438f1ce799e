use std::io::Cursor;

use suppaftp::{types::FileType, FtpStream};

use super::DeliveryError;
use crate::config::Config;

fn transfer_err(err: impl std::fmt::Display) -> DeliveryError {
    DeliveryError::Transfer(err.to_string())
}

/// Pushes one recommendation file onto the admin's FTP store. Blocking;
/// callers go through `web::block`.
pub fn upload(config: &Config, filename: &str, contents: &[u8]) -> Result<(), DeliveryError> {
    let mut ftp = FtpStream::connect((config.ftp_host.as_str(), config.ftp_port))
        .map_err(transfer_err)?;
    ftp.login(&config.ftp_user, &config.ftp_password)
        .map_err(transfer_err)?;
    ftp.transfer_type(FileType::Binary).map_err(transfer_err)?;
    ftp.put_file(filename, &mut Cursor::new(contents))
        .map_err(transfer_err)?;
    let _ = ftp.quit();

    log::info!(
        "stored {} ({} bytes) on {}",
        filename,
        contents.len(),
        config.ftp_host
    );
    Ok(())
}
