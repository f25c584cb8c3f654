//! Warden channel commands

use anyhow::{Context, Result};
use colored::Colorize;
use revcheck::warden::{EncryptionContext, HashChainPrng, WARDEN_KEY_LEN};

use crate::output::{self, print_field};

/// Which cipher of the session to use
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Direction {
    /// Outgoing data, send key
    Send,
    /// Incoming data, receive key
    Receive,
}

/// Parse a seed given as decimal or `0x` hex
pub fn parse_seed(s: &str) -> Result<u32, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    parsed.map_err(|e| format!("invalid seed '{}': {}", s, e))
}

/// Parse hex input, ignoring whitespace
pub fn parse_hex(s: &str) -> Result<Vec<u8>> {
    let digits: String = s.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    hex::decode(&digits).with_context(|| format!("Invalid hex input '{}'", s))
}

fn context(seed: u32, mirrored: bool) -> EncryptionContext {
    if mirrored {
        EncryptionContext::new_mirrored(seed)
    } else {
        EncryptionContext::new(seed)
    }
}

/// Encrypt or decrypt hex data
pub fn crypt(seed: u32, mirrored: bool, data: &str, direction: Direction) -> Result<()> {
    let input = parse_hex(data)?;
    let mut ctx = context(seed, mirrored);

    let result = match direction {
        Direction::Send => ctx.encrypt(&input),
        Direction::Receive => ctx.decrypt(&input),
    };

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "seed": seed,
            "mirrored": mirrored,
            "input": hex::encode(&input),
            "output": hex::encode(&result),
        }))?;
    } else {
        println!("{}", hex::encode(&result));
    }

    Ok(())
}

/// Show the keys derived from a seed
pub fn keys(seed: u32, extra: usize) -> Result<()> {
    let mut prng = HashChainPrng::new(&seed.to_le_bytes());
    let send = prng.next_bytes(WARDEN_KEY_LEN);
    let recv = prng.next_bytes(WARDEN_KEY_LEN);
    let following = prng.next_bytes(extra);

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "seed": seed,
            "send_key": hex::encode(&send),
            "recv_key": hex::encode(&recv),
            "extra": hex::encode(&following),
        }))?;
        return Ok(());
    }

    println!("{}", "Warden keys:".bold());
    print_field("Seed", format!("{:#010x}", seed));
    print_field("Send key", hex::encode(&send));
    print_field("Receive key", hex::encode(&recv));
    if extra > 0 {
        print_field("Next bytes", hex::encode(&following));
    }

    Ok(())
}
