//! Server-rendered HTML pages for the books UI.

use std::fmt::Write;

use axum::http::StatusCode;
use shelf_db::{BookId, Category, ValidationErrors};

use super::models::FormValues;
use super::serializer::Representation;

/// Escape text for use in element content and quoted attribute values.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn layout(title: &str, notice: Option<&str>, body: &str) -> String {
    let notice = notice
        .map(|message| format!(r#"<p class="notice" id="notice">{}</p>"#, escape(message)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} | Shelf</title>
</head>
<body>
<header><a href="/books">Shelf</a></header>
<main>
{notice}
{body}
</main>
</body>
</html>
"#,
        title = escape(title),
    )
}

fn price(value: f64) -> String {
    format!("{:.2}", value)
}

fn category_label(book: &Representation) -> String {
    book.category_name
        .as_deref()
        .map(escape)
        .unwrap_or_else(|| "&mdash;".to_string())
}

pub fn index(books: &[Representation], search: Option<&str>, notice: Option<&str>) -> String {
    let mut body = String::new();
    let _ = write!(
        body,
        r#"<h1>Books</h1>
<form action="/books" method="get" class="search">
<input type="search" name="search" value="{}" placeholder="Search by title or author">
<button type="submit">Search</button>
</form>
<p><a href="/books/new">New book</a></p>
"#,
        escape(search.unwrap_or_default())
    );

    if books.is_empty() {
        body.push_str(r#"<p class="empty">No books found.</p>"#);
    } else {
        body.push_str(
            "<table>\n<thead><tr><th>Title</th><th>Author</th><th>Price</th><th>Category</th></tr></thead>\n<tbody>\n",
        );
        for book in books {
            let _ = writeln!(
                body,
                r#"<tr id="book_{id}"><td><a href="/books/{id}">{title}</a></td><td>{author}</td><td>{price}</td><td>{category}</td></tr>"#,
                id = book.id,
                title = escape(&book.title),
                author = escape(&book.author),
                price = price(book.price),
                category = category_label(book),
            );
        }
        body.push_str("</tbody>\n</table>");
    }

    layout("Books", notice, &body)
}

pub fn show(book: &Representation, notice: Option<&str>) -> String {
    let body = format!(
        r#"<article id="book_{id}">
<h1>{title}</h1>
<dl>
<dt>Author</dt><dd>{author}</dd>
<dt>Price</dt><dd>{price}</dd>
<dt>Category</dt><dd>{category}</dd>
</dl>
</article>
<p><a href="/books/{id}/edit">Edit</a> | <a href="/books">Back to books</a></p>
<form action="/books/{id}" method="post">
<input type="hidden" name="_method" value="delete">
<button type="submit">Destroy</button>
</form>"#,
        id = book.id,
        title = escape(&book.title),
        author = escape(&book.author),
        price = price(book.price),
        category = category_label(book),
    );

    layout(&book.title, notice, &body)
}

fn error_list(errors: Option<&ValidationErrors>) -> String {
    let Some(errors) = errors.filter(|errors| !errors.is_empty()) else {
        return String::new();
    };

    let mut html = format!(
        "<div id=\"error_explanation\">\n<h2>{} prohibited this book from being saved:</h2>\n<ul>\n",
        match errors.len() {
            1 => "1 error".to_string(),
            n => format!("{} errors", n),
        }
    );
    for message in errors.full_messages() {
        let _ = writeln!(html, "<li>{}</li>", escape(&message));
    }
    html.push_str("</ul>\n</div>\n");
    html
}

fn form(
    action: &str,
    method: Option<&str>,
    values: &FormValues,
    errors: Option<&ValidationErrors>,
    categories: &[Category],
    submit: &str,
) -> String {
    let mut html = error_list(errors);
    let _ = writeln!(html, r#"<form action="{}" method="post">"#, escape(action));
    if let Some(method) = method {
        let _ = writeln!(html, r#"<input type="hidden" name="_method" value="{}">"#, method);
    }

    let _ = write!(
        html,
        r#"<div class="field"><label for="book_title">Title</label>
<input type="text" id="book_title" name="title" value="{title}"></div>
<div class="field"><label for="book_author">Author</label>
<input type="text" id="book_author" name="author" value="{author}"></div>
<div class="field"><label for="book_price">Price</label>
<input type="text" inputmode="decimal" id="book_price" name="price" value="{price}"></div>
<div class="field"><label for="book_category_id">Category</label>
<select id="book_category_id" name="category_id">
<option value="">None</option>
"#,
        title = escape(&values.title),
        author = escape(&values.author),
        price = escape(&values.price),
    );

    for category in categories {
        let id = category.id.to_string();
        let selected = if values.category_id.trim() == id {
            " selected"
        } else {
            ""
        };
        let _ = writeln!(
            html,
            r#"<option value="{}"{}>{}</option>"#,
            id,
            selected,
            escape(&category.name)
        );
    }

    let _ = write!(
        html,
        "</select></div>\n<div class=\"actions\"><button type=\"submit\">{}</button></div>\n</form>",
        escape(submit)
    );
    html
}

pub fn new_form(
    values: &FormValues,
    errors: Option<&ValidationErrors>,
    categories: &[Category],
) -> String {
    let mut body = String::from("<h1>New book</h1>\n");
    body.push_str(&form(
        "/books",
        None,
        values,
        errors,
        categories,
        "Create Book",
    ));
    body.push_str("\n<p><a href=\"/books\">Back to books</a></p>");
    layout("New book", None, &body)
}

pub fn edit_form(
    id: BookId,
    values: &FormValues,
    errors: Option<&ValidationErrors>,
    categories: &[Category],
) -> String {
    let action = format!("/books/{}", id);
    let mut body = String::from("<h1>Editing book</h1>\n");
    body.push_str(&form(
        &action,
        Some("patch"),
        values,
        errors,
        categories,
        "Update Book",
    ));
    let _ = write!(
        body,
        "\n<p><a href=\"/books/{id}\">Show</a> | <a href=\"/books\">Back to books</a></p>"
    );
    layout("Editing book", None, &body)
}

pub fn error_page(status: StatusCode, message: &str) -> String {
    let heading = status.canonical_reason().unwrap_or("Error");
    let body = format!(
        "<h1>{}</h1>\n<p>{}</p>\n<p><a href=\"/books\">Back to books</a></p>",
        escape(heading),
        escape(message)
    );
    layout(heading, None, &body)
}
