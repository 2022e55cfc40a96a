//! `conjur hostfactory`

use std::net::IpAddr;
use std::time::Duration;

use crate::client::TokenRequest;
use crate::commands::{HostFactoryCommands, HostsCommands, TokenCommands};
use crate::common::{Error, Result};

use super::{print_json, CommandIo, Context};

pub(super) async fn run(
    command: HostFactoryCommands,
    io: &mut CommandIo<'_>,
    ctx: &Context,
) -> Result<()> {
    match command {
        HostFactoryCommands::Tokens(TokenCommands::Create {
            duration,
            host_factory_id,
            cidr,
            count,
        }) => {
            let duration = parse_duration(&duration).map_err(Error::InvalidArgument)?;
            if duration.is_zero() {
                return Err(Error::InvalidArgument(
                    "token duration must be greater than zero".to_string(),
                ));
            }
            if count == 0 {
                return Err(Error::InvalidArgument("count must be at least 1".to_string()));
            }
            let cidr = cidr
                .iter()
                .map(|c| validate_cidr(c))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(Error::InvalidArgument)?;

            let request = TokenRequest {
                host_factory: host_factory_id,
                duration,
                cidr,
                count,
            };
            let client = ctx.connect().await?;
            let tokens = client.create_token(&request).await?;
            print_json(io, &tokens).await
        }

        HostFactoryCommands::Tokens(TokenCommands::Revoke { token }) => {
            let client = ctx.connect().await?;
            client.delete_token(&token).await?;
            io.println("Token revoked").await
        }

        HostFactoryCommands::Hosts(HostsCommands::Create { token, id }) => {
            // The token authorizes the request; no login is needed
            let (_, client) = ctx.connect_anonymous().await?;
            let host = client.create_host(&id, &token).await?;
            print_json(io, &host).await
        }
    }
}

/// Parse a duration such as `10m`, `1h30m` or `1.5h`
///
/// Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. A bare `0`
/// is accepted without a unit.
pub(crate) fn parse_duration(input: &str) -> std::result::Result<Duration, String> {
    let text = input.trim();
    if text == "0" {
        return Ok(Duration::ZERO);
    }
    let invalid = || format!("invalid duration \"{}\"", input);
    if text.is_empty() {
        return Err(invalid());
    }

    let is_number = |c: char| c.is_ascii_digit() || c == '.';
    let mut rest = text;
    let mut nanos = 0f64;

    while !rest.is_empty() {
        let number_end = rest.find(|c: char| !is_number(c)).unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_end);
        if number.is_empty() || number == "." {
            return Err(invalid());
        }
        let value: f64 = number.parse().map_err(|_| invalid())?;

        let unit_end = tail.find(is_number).unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_end);
        let scale = match unit {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => return Err(format!("missing unit in duration \"{}\"", input)),
            other => {
                return Err(format!(
                    "unknown unit \"{}\" in duration \"{}\"",
                    other, input
                ))
            }
        };

        nanos += value * scale;
        rest = next;
    }

    Ok(Duration::from_nanos(nanos.round() as u64))
}

/// Accept an IP address or a CIDR block, returning it trimmed
pub(crate) fn validate_cidr(input: &str) -> std::result::Result<String, String> {
    let text = input.trim();
    let invalid = || format!("invalid CIDR address \"{}\"", input);

    match text.split_once('/') {
        None => {
            text.parse::<IpAddr>().map_err(|_| invalid())?;
        }
        Some((address, prefix)) => {
            let address: IpAddr = address.parse().map_err(|_| invalid())?;
            let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
            let max = if address.is_ipv4() { 32 } else { 128 };
            if prefix > max {
                return Err(invalid());
            }
        }
    }
    Ok(text.to_string())
}
