use bcrypt::DEFAULT_COST;

// Mirrors `auth::MAX_PASSWORD_BYTES` and `auth::truncated` in the server
// binary; change them together or printed hashes stop verifying at login.
const MAX_PASSWORD_BYTES: usize = 72;

fn main() -> anyhow::Result<()> {
    let password = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("Usage: hashpass <password>"))?;
    let bytes = password.as_bytes();
    let hash = bcrypt::hash(&bytes[..bytes.len().min(MAX_PASSWORD_BYTES)], DEFAULT_COST)?;
    println!("{hash}");
    Ok(())
}
