use crate::application::auth::{self, AuthDependencies};
use crate::application::catalog::{self, CatalogDependencies};
use crate::application::circulation::{self, CirculationDependencies};
use crate::domain::value_objects::{Role, UserId};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use std::sync::Arc;

use super::error::ApiError;
use super::extract::AuthUser;
use super::types::{
    AddBookRequest, AuthorQuery, BookView, BooksResponse, BorrowedBookView, BorrowedBooksResponse,
    BorrowingView, CirculationRequest, LoginRequest, LoginResponse, MsgResponse, ProfileResponse,
    RegisterRequest, TitleQuery, UserIdQuery,
};

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthDependencies,
    pub catalog: CatalogDependencies,
    pub circulation: CirculationDependencies,
}

// ============================================================================
// Auth handlers
// ============================================================================

/// POST /auth/register - 利用者登録
///
/// 強制されるビジネスルール:
/// - ユーザー名とパスワードが両方あること
/// - ユーザー名が一意であること
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<MsgResponse>), ApiError> {
    let (Some(username), Some(password)) = (req.username.as_deref(), req.password.as_deref())
    else {
        return Err(ApiError::bad_request("Username and password are required"));
    };

    auth::register_user(&state.auth, username, password).await?;

    Ok((
        StatusCode::CREATED,
        Json(MsgResponse {
            msg: "User created successfully".to_string(),
        }),
    ))
}

/// POST /auth/login - ログインしてアクセストークンを得る
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    // 欠けた項目は空文字として扱い、存在しない利用者と同じ401にする
    let username = req.username.as_deref().unwrap_or_default();
    let password = req.password.as_deref().unwrap_or_default();

    let token = auth::login(&state.auth, username, password).await?;

    Ok(Json(LoginResponse {
        msg: "Login successful".to_string(),
        access_token: token,
    }))
}

// ============================================================================
// Book handlers
// ============================================================================

/// POST /books/add - 書籍登録（librarianのみ）
///
/// 強制されるビジネスルール:
/// - タイトル・著者・ISBNが必須
/// - ISBNが一意であること
/// - available_copies の既定値は1
pub async fn add_book(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<AddBookRequest>,
) -> Result<(StatusCode, Json<MsgResponse>), ApiError> {
    user.require_role(&[Role::Librarian])?;

    let title = req.title.as_deref().unwrap_or_default();
    let author = req.author.as_deref().unwrap_or_default();
    let isbn = req.isbn.as_deref().unwrap_or_default();
    let available_copies = req.available_copies.unwrap_or(1);

    catalog::add_book(&state.catalog, title, author, isbn, available_copies).await?;

    Ok((
        StatusCode::CREATED,
        Json(MsgResponse {
            msg: "Book added successfully".to_string(),
        }),
    ))
}

/// GET /books/all_books - 全書籍の一覧
pub async fn all_books(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<BooksResponse>, ApiError> {
    user.require_role(&[Role::Librarian, Role::User])?;

    let books = catalog::all_books(&state.catalog)
        .await
        .map_err(|e| ApiError::internal(format!("Error retrieving books: {}", e)))?;

    if books.is_empty() {
        return Err(ApiError::not_found("No books found"));
    }

    Ok(Json(BooksResponse {
        books: books.into_iter().map(BookView::from).collect(),
    }))
}

/// GET /books/borrowed_books?user_id= - 利用者の貸出中書籍
pub async fn borrowed_books(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<BorrowedBooksResponse>, ApiError> {
    user.require_role(&[Role::Librarian, Role::User])?;

    // user_id なしは「貸出なし」と同じ扱い
    let rows = match query.user_id {
        Some(user_id) => catalog::borrowed_books(&state.catalog, UserId::new(user_id)).await?,
        None => Vec::new(),
    };

    if rows.is_empty() {
        return Err(ApiError::not_found("No books borrowed"));
    }

    Ok(Json(BorrowedBooksResponse {
        borrowed_books: rows
            .into_iter()
            .map(|(borrowing, book)| BorrowedBookView {
                book_id: book.id.value(),
                title: book.title,
                author: book.author,
                isbn: book.isbn.as_str().to_string(),
                return_by: borrowing.return_by,
            })
            .collect(),
    }))
}

/// GET /books/search?title= - タイトルの部分一致検索
pub async fn search_by_title(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<TitleQuery>,
) -> Result<Json<BooksResponse>, ApiError> {
    user.require_role(&[Role::Librarian, Role::User])?;

    let Some(title) = query.title.filter(|t| !t.is_empty()) else {
        return Err(ApiError::bad_request("Title query parameter is required"));
    };

    let books = catalog::search_by_title(&state.catalog, &title).await?;
    if books.is_empty() {
        return Err(ApiError::not_found("No books found matching the title"));
    }

    Ok(Json(BooksResponse {
        books: books.into_iter().map(BookView::from).collect(),
    }))
}

/// GET /books/search_by_author?author= - 著者の部分一致検索
pub async fn search_by_author(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<AuthorQuery>,
) -> Result<Json<BooksResponse>, ApiError> {
    user.require_role(&[Role::Librarian, Role::User])?;

    let Some(author) = query.author.filter(|a| !a.is_empty()) else {
        return Err(ApiError::bad_request("Author query parameter is required"));
    };

    let books = catalog::search_by_author(&state.catalog, &author).await?;
    if books.is_empty() {
        return Err(ApiError::not_found("No books found matching the author"));
    }

    Ok(Json(BooksResponse {
        books: books.into_iter().map(BookView::from).collect(),
    }))
}

// ============================================================================
// User handlers
// ============================================================================

/// GET /user/profile - プロフィール取得
///
/// この利用者ストアに行がなければクレームから補完して返す。
pub async fn profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = auth::ensure_profile(&state.auth, &user.0).await?;

    Ok(Json(ProfileResponse {
        id: profile.id.value(),
        role: profile.role.as_str().to_string(),
        name: profile.name,
        username: profile.username,
    }))
}

/// POST /user/borrow - 借用要求（userのみ）
///
/// 蔵書サービスへの要求を発行し、相関された応答を待ってから返す。
pub async fn borrow_book(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CirculationRequest>,
) -> Result<Json<MsgResponse>, ApiError> {
    user.require_role(&[Role::User])?;

    let message = circulation::request_borrow(
        &state.circulation,
        req.user_id.unwrap_or(0),
        req.book_id.unwrap_or(0),
    )
    .await?;

    Ok(Json(MsgResponse { msg: message }))
}

/// POST /user/return - 返却要求（userのみ）
pub async fn return_book(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CirculationRequest>,
) -> Result<Json<MsgResponse>, ApiError> {
    user.require_role(&[Role::User])?;

    let message = circulation::request_return(
        &state.circulation,
        req.user_id.unwrap_or(0),
        req.book_id.unwrap_or(0),
    )
    .await?;

    Ok(Json(MsgResponse { msg: message }))
}

/// GET /user/borrowings?user_id= - 未返却貸出のビュー
///
/// 結果が空でも200で空配列を返す。
pub async fn user_borrowings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<Vec<BorrowingView>>, ApiError> {
    user.require_role(&[Role::Librarian, Role::User])?;

    let Some(user_id) = query.user_id else {
        return Err(ApiError::bad_request("user_id is required"));
    };

    let rows = catalog::borrowed_books(&state.catalog, UserId::new(user_id)).await?;

    Ok(Json(
        rows.into_iter()
            .map(|(borrowing, book)| BorrowingView {
                title: book.title,
                borrowed_on: borrowing.borrowed_on,
                return_by: borrowing.return_by,
            })
            .collect(),
    ))
}
