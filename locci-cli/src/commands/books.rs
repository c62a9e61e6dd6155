//! Catalog command handlers

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use locci_client::LocciClient;
use locci_core::domain::book::Book;

use crate::config::Config;

/// Catalog subcommands
#[derive(Subcommand)]
pub enum BookCommands {
    /// List all books
    List,
    /// Show one book
    Get {
        /// Book ID
        id: String,
    },
    /// Add a book
    Create {
        /// Book ID
        #[arg(long)]
        id: String,

        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        author: String,

        /// Copies in stock
        #[arg(short, long, default_value = "1")]
        quantity: i32,
    },
    /// Take one copy out of stock
    Checkout {
        /// Book ID
        id: String,
    },
    /// Put one copy back into stock
    Return {
        /// Book ID
        id: String,
    },
}

/// Handle catalog commands
pub async fn handle_book_command(command: BookCommands, config: &Config) -> Result<()> {
    let client = config.client()?;

    match command {
        BookCommands::List => list_books(&client).await,
        BookCommands::Get { id } => {
            print_book(&client.get_book(&id).await?);
            Ok(())
        }
        BookCommands::Create {
            id,
            title,
            author,
            quantity,
        } => {
            let book = client
                .create_book(&Book {
                    id,
                    title,
                    author,
                    quantity,
                })
                .await?;
            println!("{}", "✓ Book created successfully!".green().bold());
            print_book(&book);
            Ok(())
        }
        BookCommands::Checkout { id } => {
            let book = client.checkout_book(&id).await?;
            println!("{}", "✓ Checked out".green().bold());
            print_book(&book);
            Ok(())
        }
        BookCommands::Return { id } => {
            let book = client.return_book(&id).await?;
            println!("{}", "✓ Returned".green().bold());
            print_book(&book);
            Ok(())
        }
    }
}

async fn list_books(client: &LocciClient) -> Result<()> {
    let books = client.list_books().await?;

    if books.is_empty() {
        println!("{}", "No books found.".yellow());
        return Ok(());
    }

    println!("{}", format!("Found {} book(s):", books.len()).bold());
    println!();
    for book in &books {
        print_book(book);
    }
    Ok(())
}

fn print_book(book: &Book) {
    let quantity = if book.quantity > 0 {
        book.quantity.to_string().green()
    } else {
        book.quantity.to_string().red()
    };

    println!("  {} {}", "▸".cyan(), book.title.bold());
    println!("    ID:       {}", book.id.dimmed());
    println!("    Author:   {}", book.author);
    println!("    In stock: {}", quantity);
    println!();
}
