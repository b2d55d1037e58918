//! Password hashing utility for LiveChat staff accounts
//!
//! Prints an Argon2id hash and the SQL to create a staff account with it, so
//! admins and agents can be added without a plaintext password ever touching
//! the database.
//!
//! Usage:
//!   cargo run --bin hash-password
//!   cargo run --bin hash-password "MySecurePassword123!"

use livechat_api::auth::{hash_password, password::MIN_PASSWORD_LENGTH};
use std::env;
use std::io::{self, Write};

fn main() -> anyhow::Result<()> {
    let password = match env::args().nth(1) {
        Some(pwd) => pwd,
        None => {
            // Read from stdin so the password stays out of the process list
            print!("Enter password to hash: ");
            io::stdout().flush()?;

            let mut password = String::new();
            io::stdin().read_line(&mut password)?;
            password.trim().to_string()
        }
    };

    if password.is_empty() {
        anyhow::bail!("Password cannot be empty");
    }

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        eprintln!(
            "Warning: Password is shorter than {MIN_PASSWORD_LENGTH} characters. Consider using a longer password."
        );
    }

    let password_hash = hash_password(&password)?;

    println!("\n===========================================");
    println!("Password Hash (Argon2id):");
    println!("===========================================");
    println!("{password_hash}");
    println!("===========================================\n");

    println!("Example SQL (role is ADMIN or AGENT):");
    println!(
        "INSERT INTO users (id, name, email, password_hash, role)\n\
         VALUES (gen_random_uuid(), 'Support', 'support@example.com', '{password_hash}', 'AGENT');"
    );

    Ok(())
}
