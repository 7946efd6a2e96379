//! Book and author commands.

use bookstore_client::ClientError;
use bookstore_client::api::{AuthorUpdate, Book, BookUpdate, NewAuthor, NewBook};
use bookstore_core::{AuthorId, BookId};

use super::Context;

fn print_book_row(book: &Book) {
    println!("{}  {:>8}  {}", book.id, book.price.to_string(), book.title);
}

/// List every book.
///
/// # Errors
///
/// Returns `ClientError` if the request fails.
pub async fn list_books(ctx: &Context) -> Result<(), ClientError> {
    let books = ctx.session.books().list().await?;
    if books.is_empty() {
        println!("The catalog is empty.");
    }
    for book in &books {
        print_book_row(book);
    }
    Ok(())
}

/// Show one book in full.
///
/// # Errors
///
/// Returns `ClientError` if the book does not exist or the request fails.
pub async fn show_book(ctx: &Context, id: BookId) -> Result<(), ClientError> {
    let book = ctx.session.books().get(id).await?;
    println!("{}", book.title);
    println!("Price:     {}", book.price);
    println!("Author:    {}", book.author_id);
    if let Some(date) = book.published_date {
        println!("Published: {}", date.format("%Y-%m-%d"));
    }
    if let Some(description) = &book.description {
        println!();
        println!("{description}");
    }
    Ok(())
}

/// Add a book to the catalog.
///
/// # Errors
///
/// Returns `ClientError` if the request fails (403 for non-admins).
pub async fn create_book(ctx: &Context, book: &NewBook) -> Result<(), ClientError> {
    let book = ctx.session.books().create(book).await?;
    println!("Created book {}", book.id);
    Ok(())
}

/// Change a book.
///
/// # Errors
///
/// Returns `ClientError` if nothing was given to change or the request fails.
pub async fn update_book(
    ctx: &Context,
    id: BookId,
    update: &BookUpdate,
) -> Result<(), ClientError> {
    let book = ctx.session.books().update(id, update).await?;
    println!("Updated book {}", book.id);
    Ok(())
}

/// Remove a book.
///
/// # Errors
///
/// Returns `ClientError` if the request fails.
pub async fn delete_book(ctx: &Context, id: BookId) -> Result<(), ClientError> {
    ctx.session.books().delete(id).await?;
    println!("Deleted book {id}");
    Ok(())
}

/// List every author.
///
/// # Errors
///
/// Returns `ClientError` if the request fails.
pub async fn list_authors(ctx: &Context) -> Result<(), ClientError> {
    let authors = ctx.session.authors().list().await?;
    for author in &authors {
        println!("{}  {}", author.id, author.name);
    }
    Ok(())
}

/// Show an author and their books.
///
/// # Errors
///
/// Returns `ClientError` if the author does not exist or the request fails.
pub async fn show_author(ctx: &Context, id: AuthorId) -> Result<(), ClientError> {
    let author = ctx.session.authors().get(id).await?;
    println!("{}", author.name);
    if let Some(bio) = &author.bio {
        println!("{bio}");
    }
    if !author.books.is_empty() {
        println!();
        for book in &author.books {
            print_book_row(book);
        }
    }
    Ok(())
}

/// Add an author.
///
/// # Errors
///
/// Returns `ClientError` if the request fails (403 for non-admins).
pub async fn create_author(ctx: &Context, author: &NewAuthor) -> Result<(), ClientError> {
    let author = ctx.session.authors().create(author).await?;
    println!("Created author {}", author.id);
    Ok(())
}

/// Change an author.
///
/// # Errors
///
/// Returns `ClientError` if nothing was given to change or the request fails.
pub async fn update_author(
    ctx: &Context,
    id: AuthorId,
    update: &AuthorUpdate,
) -> Result<(), ClientError> {
    let author = ctx.session.authors().update(id, update).await?;
    println!("Updated author {}", author.id);
    Ok(())
}

/// Remove an author.
///
/// # Errors
///
/// Returns `ClientError` if the request fails.
pub async fn delete_author(ctx: &Context, id: AuthorId) -> Result<(), ClientError> {
    ctx.session.authors().delete(id).await?;
    println!("Deleted author {id}");
    Ok(())
}
