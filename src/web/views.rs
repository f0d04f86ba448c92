use std::fmt::Write as _;

use axum::http::StatusCode;

use crate::{
    db::Expense,
    expenses::services::{ExpenseListing, ALL_CATEGORIES},
    reports::{
        aggregate::Summary,
        charts::{Charts, PALETTE},
    },
};

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, flash: Option<&str>, logged_in: bool, body: &str) -> String {
    let nav = if logged_in {
        r#"<a href="/">Home</a> | <a href="/add_expense">Add expense</a> | <a href="/view_expenses">Expenses</a> | <a href="/summary">Summary</a> | <a href="/logout">Log out</a>"#
    } else {
        r#"<a href="/login">Log in</a> | <a href="/register">Register</a>"#
    };
    let notice = flash
        .map(|m| format!(r#"<p class="flash">{}</p>"#, escape(m)))
        .unwrap_or_default();
    format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>{title}</title></head>
<body>
<nav>{nav}</nav>
{notice}
<main>
<h1>{title}</h1>
{body}
</main>
</body>
</html>
"#,
        title = escape(title),
    )
}

fn credentials_form(action: &str, submit: &str) -> String {
    format!(
        r#"<form method="post" action="{action}">
<label>Username <input type="text" name="username" required></label>
<label>Password <input type="password" name="password" required></label>
<button type="submit">{submit}</button>
</form>"#
    )
}

pub fn register_page(flash: Option<&str>) -> String {
    layout(
        "Register",
        flash,
        false,
        &credentials_form("/register", "Register"),
    )
}

pub fn login_page(flash: Option<&str>) -> String {
    layout("Log in", flash, false, &credentials_form("/login", "Log in"))
}

pub fn index_page(flash: Option<&str>, username: &str) -> String {
    let body = format!(
        "<p>Welcome, {}.</p>\n<p>Record what you spend, browse it by category and see where it goes.</p>",
        escape(username)
    );
    layout("Expense Tracker", flash, true, &body)
}

/// Add form when `expense` is `None`, prefilled edit form otherwise.
pub fn expense_form_page(flash: Option<&str>, expense: Option<&Expense>) -> String {
    let (title, action, description, amount, category) = match expense {
        Some(e) => (
            "Edit expense",
            format!("/edit_expense/{}", e.id),
            escape(&e.description),
            e.amount.to_string(),
            escape(&e.category),
        ),
        None => (
            "Add expense",
            "/add_expense".to_string(),
            String::new(),
            String::new(),
            String::new(),
        ),
    };
    let body = format!(
        r#"<form method="post" action="{action}">
<label>Description <input type="text" name="description" value="{description}" required></label>
<label>Amount <input type="text" name="amount" value="{amount}" required></label>
<label>Category <input type="text" name="category" value="{category}" required></label>
<button type="submit">Save</button>
</form>"#
    );
    layout(title, flash, true, &body)
}

pub fn expenses_page(flash: Option<&str>, listing: &ExpenseListing) -> String {
    let current = listing.current_filter.as_deref().unwrap_or(ALL_CATEGORIES);
    let mut body = String::from(
        "<form method=\"post\" action=\"/view_expenses\">\n<select name=\"category_filter\">\n",
    );
    for c in &listing.categories {
        let selected = if c == current { " selected" } else { "" };
        let _ = writeln!(
            body,
            r#"<option value="{v}"{selected}>{v}</option>"#,
            v = escape(c)
        );
    }
    body.push_str("</select>\n<button type=\"submit\">Filter</button>\n</form>\n");

    if listing.expenses.is_empty() {
        body.push_str("<p>No expenses recorded.</p>\n");
    } else {
        body.push_str(
            "<table>\n<tr><th>Date</th><th>Description</th><th>Category</th><th>Amount</th><th></th></tr>\n",
        );
        for e in &listing.expenses {
            let _ = writeln!(
                body,
                r#"<tr><td>{date}</td><td>{desc}</td><td>{cat}</td><td>{amount:.2}</td><td><a href="/edit_expense/{id}">Edit</a> <a href="/delete_expense/{id}">Delete</a></td></tr>"#,
                date = format_date(e),
                desc = escape(&e.description),
                cat = escape(&e.category),
                amount = e.amount,
                id = e.id,
            );
        }
        body.push_str("</table>\n");
    }
    layout("Expenses", flash, true, &body)
}

fn format_date(e: &Expense) -> String {
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}",
        e.date.year(),
        u8::from(e.date.month()),
        e.date.day(),
        e.date.hour(),
        e.date.minute()
    )
}

fn chart_block(heading: &str, uri: Option<&str>) -> String {
    match uri {
        Some(src) => format!(
            "<section>\n<h2>{}</h2>\n<img src=\"{}\" alt=\"{}\">\n</section>\n",
            escape(heading),
            src,
            escape(heading)
        ),
        None => String::new(),
    }
}

pub fn summary_page(flash: Option<&str>, summary: &Summary, charts: &Charts) -> String {
    let mut body = String::new();
    if !summary.has_expenses {
        body.push_str("<p>No expenses yet. Add some to see the summary.</p>\n");
    } else {
        body.push_str(&chart_block("Expenses by Category", charts.pie.as_deref()));
        body.push_str("<ul class=\"legend\">\n");
        for (i, slice) in summary.pie_slices().iter().enumerate() {
            let (r, g, b) = PALETTE[i % PALETTE.len()];
            let _ = writeln!(
                body,
                r#"<li><span style="color: rgb({r},{g},{b})">&#9632;</span> {} {:.2} ({})</li>"#,
                escape(&slice.category),
                slice.total,
                slice.label()
            );
        }
        body.push_str("</ul>\n");
        body.push_str(&chart_block("Totals by Category", charts.bar.as_deref()));
        body.push_str("<ol class=\"bars\">\n");
        for (category, total) in &summary.category_totals {
            let _ = writeln!(body, "<li>{} {:.2}</li>", escape(category), total);
        }
        body.push_str("</ol>\n");
        body.push_str(&chart_block(
            "Monthly Expenses Over Time",
            charts.time_series.as_deref(),
        ));
        body.push_str("<ol class=\"months\">\n");
        for (month, total) in &summary.monthly_totals {
            let _ = writeln!(body, "<li>{} {:.2}</li>", month, total);
        }
        body.push_str("</ol>\n");
    }
    let _ = write!(
        body,
        "<script type=\"application/json\" id=\"category-totals\">{}</script>\n<script type=\"application/json\" id=\"monthly-totals\">{}</script>\n",
        json_for_script(&summary.category_totals_json()),
        json_for_script(&summary.monthly_totals_json()),
    );
    layout("Summary", flash, true, &body)
}

/// Keeps a JSON payload from closing its `<script>` element.
fn json_for_script(json: &str) -> String {
    json.replace("</", "<\\/")
}

pub fn error_page(status: StatusCode, message: &str) -> String {
    layout(
        &status.to_string(),
        None,
        false,
        &format!("<p>{}</p>", escape(message)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape(r#"<b>"Tom & Jerry's"</b>"#),
            "&lt;b&gt;&quot;Tom &amp; Jerry&#x27;s&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn listing_marks_current_filter_and_escapes_rows() {
        let listing = ExpenseListing {
            expenses: vec![Expense {
                id: 3,
                description: "<script>".into(),
                amount: 4.5,
                category: "food".into(),
                date: datetime!(2024-01-05 9:30 UTC),
                user_id: 1,
            }],
            categories: vec!["all".into(), "food".into()],
            current_filter: Some("food".into()),
        };
        let html = expenses_page(None, &listing);
        assert!(html.contains(r#"<option value="food" selected>food</option>"#));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("2024-01-05 09:30"));
        assert!(html.contains("/edit_expense/3"));
    }

    #[test]
    fn empty_summary_has_no_images() {
        let html = summary_page(None, &Summary::default(), &Charts::default());
        assert!(!html.contains("<img"));
        assert!(html.contains("No expenses yet"));
        assert!(html.contains(r#"id="category-totals">{}</script>"#));
    }
}
