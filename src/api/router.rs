use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{
    AppState, add_book, all_books, borrow_book, borrowed_books, login, profile, register,
    return_book, search_by_author, search_by_title, user_borrowings,
};

/// Creates the API router with all endpoints
///
/// Auth endpoints:
/// - POST /auth/register - Register a new user
/// - POST /auth/login - Log in and obtain an access token
///
/// Book endpoints:
/// - POST /books/add - Add a book (librarian only)
/// - GET /books/all_books - List all books
/// - GET /books/borrowed_books - Books currently borrowed by a user
/// - GET /books/search - Search books by title
/// - GET /books/search_by_author - Search books by author
///
/// User endpoints:
/// - GET /user/profile - Current user's profile
/// - POST /user/borrow - Request to borrow a book
/// - POST /user/return - Request to return a book
/// - GET /user/borrowings - Open borrowings of a user
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        // Auth endpoints
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        // Book endpoints
        .route("/books/add", post(add_book))
        .route("/books/all_books", get(all_books))
        .route("/books/borrowed_books", get(borrowed_books))
        .route("/books/search", get(search_by_title))
        .route("/books/search_by_author", get(search_by_author))
        // User endpoints
        .route("/user/profile", get(profile))
        .route("/user/borrow", post(borrow_book))
        .route("/user/return", post(return_book))
        .route("/user/borrowings", get(user_borrowings))
        // Add tracing middleware
        .layer(TraceLayer::new_for_http())
        // Add application state
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
