use anyhow::Result;
use konfirmi::cli::{actions, start};

// Main function
#[tokio::main]
async fn main() -> Result<()> {
    // Start the program
    let (action, globals) = start()?;

    // Handle the action
    actions::portal::handle(action, &globals).await?;

    Ok(())
}
