//! `conjur init`

use std::path::{Path, PathBuf};

use crate::commands::InitArgs;
use crate::common::profile::{parse_service_url, Profile};
use crate::common::{Error, Result};

use super::{prompts, CommandIo, Context};

pub(super) async fn run(args: InitArgs, io: &mut CommandIo<'_>, ctx: &Context) -> Result<()> {
    let url_input = match non_empty(args.url) {
        Some(url) => url,
        None => {
            prompts::ask(io, "Enter the URL of your Conjur service", &|answer: &str| {
                parse_service_url(answer).map(|_| ())
            })
            .await?
        }
    };
    let url = parse_service_url(&url_input).map_err(Error::InvalidArgument)?;

    let account = match non_empty(args.account) {
        Some(account) => account,
        None => {
            prompts::ask_required(io, "Enter your organization account name", "Account").await?
        }
    };

    let mut profile = Profile::new(account.trim(), url_input.trim().trim_end_matches('/'));
    profile.authn_type = non_empty(args.authn_type);
    profile.service_id = non_empty(args.service_id);
    profile.validate()?;

    if url.scheme() == "https" {
        let cert_path = match args.certificate {
            Some(path) => check_certificate_file(&path)?,
            None => {
                let cert = ctx.connector.fetch_certificate(&url, args.self_signed).await?;
                io.println(&format!(
                    "The server's certificate SHA-256 fingerprint is {}.",
                    cert.fingerprint
                ))
                .await?;
                io.println(
                    "Please verify this certificate on the appliance using command:\n\
                     openssl x509 -fingerprint -sha256 -noout -in ~conjur/etc/ssl/conjur.pem",
                )
                .await?;

                if !prompts::confirm(io, "Trust this certificate").await? {
                    return Err(Error::CertificateNotTrusted);
                }

                let cert_path = args.cert_file.unwrap_or_else(|| ctx.cert_path.clone());
                write_file(io, &cert_path, cert.pem.as_bytes(), args.force).await?;
                io.println(&format!("Wrote certificate to {}", cert_path.display()))
                    .await?;
                cert_path
            }
        };
        profile.cert_file = Some(cert_path);
    }

    let conjurrc_path = args.file.unwrap_or_else(|| ctx.conjurrc_path.clone());
    write_file(io, &conjurrc_path, profile.to_yaml()?.as_bytes(), args.force).await?;
    io.println(&format!("Wrote configuration to {}", conjurrc_path.display()))
        .await
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// A user-supplied certificate must at least look like PEM
fn check_certificate_file(path: &Path) -> Result<PathBuf> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
    if !content.contains("-----BEGIN CERTIFICATE-----") {
        return Err(Error::InvalidArgument(format!(
            "{} is not a PEM certificate",
            path.display()
        )));
    }
    Ok(path.to_path_buf())
}

/// Write a file, asking before replacing an existing one unless `force`
async fn write_file(
    io: &mut CommandIo<'_>,
    path: &Path,
    contents: &[u8],
    force: bool,
) -> Result<()> {
    if !force && path.exists() {
        let question = format!("File {} exists. Overwrite", path.display());
        if !prompts::confirm(io, &question).await? {
            return Err(Error::FileNotOverwritten(path.display().to_string()));
        }
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await?;
    tracing::debug!(path = %path.display(), "wrote file");
    Ok(())
}
