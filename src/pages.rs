//! Server-rendered HTML pages.
//!
//! Every page goes through [`layout`], which applies the session theme and
//! draws the shared header (home link, create link, theme toggle, signed-in
//! user). Bodies are built with `format!`; every value that did not come
//! from the markdown renderer or the highlighter is escaped.

use chrono::{DateTime, Utc};

use rulesheet_core::models::SummaryRecord;
use rulesheet_core::session::Session;
use rulesheet_core::time::{long_date, time_ago};

use crate::render::{escape, is_web_link, percent_encode};
use crate::search::SearchOutcome;

const APP_NAME: &str = "Lajlev Rules";

const STYLE: &str = r#"
:root { --bg: #ffffff; --fg: #111111; --muted: #6b7280; --border: #e5e7eb; --warn-bg: #fefce8; --warn-fg: #854d0e; --mark: #fde68a; --mark-active: #f97316; }
html[data-theme="dark"] { --bg: #0b0b0c; --fg: #f3f4f6; --muted: #9ca3af; --border: #27272a; --warn-bg: #422006; --warn-fg: #fde68a; --mark: #854d0e; --mark-active: #ea580c; }
body { margin: 0; font-family: system-ui, sans-serif; background: var(--bg); color: var(--fg); }
header, main, footer { max-width: 48rem; margin: 0 auto; padding: 0.75rem 1rem; }
header { display: flex; gap: 0.5rem; align-items: center; border-bottom: 1px solid var(--border); }
header .spacer { margin-right: auto; }
a { color: inherit; }
.muted { color: var(--muted); font-size: 0.85rem; }
.card { display: block; padding: 0.75rem 1rem; border: 1px solid var(--border); border-radius: 0.5rem; margin: 0.5rem 0; text-decoration: none; }
.warning { background: var(--warn-bg); color: var(--warn-fg); padding: 0.75rem; border-radius: 0.375rem; }
.error { color: #dc2626; }
mark.search-highlight { background: var(--mark); color: inherit; }
mark.search-highlight.active { background: var(--mark-active); }
@media print { header, footer, .no-print { display: none; } }
"#;

/// Wrap `body` in the shared document shell.
pub fn layout(session: &Session, title: &str, header_extra: &str, body: &str) -> String {
    let user = match &session.identity {
        Some(identity) => format!(
            r#"<span class="muted" title="{email}">{label}</span>"#,
            email = escape(identity.email.as_deref().unwrap_or("")),
            label = escape(identity.label()),
        ),
        None => String::new(),
    };
    let toggle_label = if session.theme.is_dark() {
        "Light mode"
    } else {
        "Dark mode"
    };

    format!(
        r#"<!doctype html>
<html lang="en" data-theme="{theme}">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>{style}</style>
</head>
<body>
<header>
<a href="/"><strong>{app}</strong></a>
<span class="spacer"></span>
{header_extra}
<form method="post" action="/theme" class="no-print"><button type="submit">{toggle_label}</button></form>
{user}
</header>
{body}
</body>
</html>
"#,
        theme = session.theme.as_str(),
        title = escape(title),
        style = STYLE,
        app = APP_NAME,
        header_extra = header_extra,
        toggle_label = toggle_label,
        user = user,
        body = body,
    )
}

/// Case-insensitive substring filter over game titles.
pub fn filter_by_title<'a>(records: &'a [SummaryRecord], query: &str) -> Vec<&'a SummaryRecord> {
    let needle = query.trim().to_lowercase();
    records
        .iter()
        .filter(|r| needle.is_empty() || r.game_title.to_lowercase().contains(&needle))
        .collect()
}

/// `GET /`: summary list with the title filter.
pub fn home(session: &Session, records: &[SummaryRecord], query: &str, now: DateTime<Utc>) -> String {
    let shown = filter_by_title(records, query);

    let list = if shown.is_empty() {
        let message = if records.is_empty() {
            "No summaries yet. Upload a rulebook to get started."
        } else {
            "No matching summaries found."
        };
        format!(r#"<p class="muted">{}</p>"#, message)
    } else {
        shown
            .iter()
            .map(|r| {
                format!(
                    r#"<a class="card" href="/summary/{id}"><strong>{title}</strong><br><span class="muted">{ago}</span></a>"#,
                    id = escape(&r.id),
                    title = escape(&r.game_title),
                    ago = time_ago(r.created_at, now),
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let body = format!(
        r#"<main>
<h1>{app} 🤘</h1>
<p class="muted">Upload a rulebook PDF to get a concise rules summary in <i>Lajlev</i> style.</p>
<form method="get" action="/">
<h2>Summaries</h2>
<input type="search" name="q" value="{query}" placeholder="Search games...">
</form>
{list}
</main>"#,
        app = APP_NAME,
        query = escape(query),
        list = list,
    );

    layout(session, APP_NAME, create_link(), &body)
}

fn create_link() -> &'static str {
    r#"<a href="/upload">Create Summary</a>"#
}

/// State for redrawing the upload form.
#[derive(Debug, Clone, Default)]
pub struct UploadForm<'a> {
    pub password_required: bool,
    pub error: Option<&'a str>,
    pub bgg_link: &'a str,
}

const UPLOAD_SCRIPT: &str = r#"
(function () {
  var form = document.getElementById('upload-form');
  var files = form.querySelector('input[name=rulebook]');
  var link = form.querySelector('input[name=bgg_link]');
  var fileBox = document.getElementById('file-duplicates');
  var linkBox = document.getElementById('link-duplicates');
  var fileSeq = 0;
  var linkSeq = 0;
  function esc(s) { var d = document.createElement('div'); d.textContent = s; return d.innerHTML; }
  function lookup(params) { return fetch('/api/duplicates?' + new URLSearchParams(params)).then(function (r) { return r.json(); }); }
  files.addEventListener('change', function () {
    var names = Array.prototype.map.call(files.files, function (f) { return f.name; });
    var seq = ++fileSeq;
    if (!names.length) { fileBox.hidden = true; fileBox.innerHTML = ''; return; }
    Promise.all(names.map(function (n) { return lookup({ filename: n }).then(function (s) { return { filename: n, summaries: s }; }); }))
      .then(function (found) {
        if (seq !== fileSeq) return;
        found = found.filter(function (d) { return d.summaries.length > 0; });
        if (!found.length) { fileBox.hidden = true; fileBox.innerHTML = ''; return; }
        fileBox.innerHTML = '<p><strong>A summary already exists for:</strong></p>' + found.map(function (d) {
          return '<p>' + esc(d.filename) + ': <a href="/summary/' + encodeURIComponent(d.summaries[0].id) + '">' + esc(d.summaries[0].gameTitle) + '</a></p>';
        }).join('') + '<p class="muted">You can still upload to create a new summary.</p>';
        fileBox.hidden = false;
      });
  });
  link.addEventListener('blur', function () {
    var value = link.value.trim();
    var seq = ++linkSeq;
    if (!value) { linkBox.hidden = true; linkBox.innerHTML = ''; return; }
    lookup({ link: value }).then(function (found) {
      if (seq !== linkSeq || link.value.trim() !== value) return;
      if (!found.length) { linkBox.hidden = true; linkBox.innerHTML = ''; return; }
      linkBox.innerHTML = '<p><strong>A summary with this BGG link already exists:</strong></p>' + found.map(function (s) {
        return '<p><a href="/summary/' + encodeURIComponent(s.id) + '">' + esc(s.gameTitle) + '</a></p>';
      }).join('') + '<p class="muted">You can still upload to create a new summary.</p>';
      linkBox.hidden = false;
    });
  });
})();
"#;

/// `GET /upload`: the rulebook form.
pub fn upload(session: &Session, form: &UploadForm<'_>) -> String {
    let error = form
        .error
        .map(|e| format!(r#"<p class="error">{}</p>"#, escape(e)))
        .unwrap_or_default();
    let password = if form.password_required {
        r#"<p><input type="password" name="password" placeholder="Password" required></p>"#
    } else {
        ""
    };

    let body = format!(
        r#"<main>
<h1>Upload Rulebook PDF</h1>
<form id="upload-form" method="post" action="/upload" enctype="multipart/form-data">
<p><input type="file" name="rulebook" accept=".pdf,application/pdf" multiple required></p>
<p><input type="url" name="bgg_link" value="{link}" placeholder="BGG link (optional)"></p>
{password}
{error}
<div id="file-duplicates" class="warning" hidden></div>
<div id="link-duplicates" class="warning" hidden></div>
<p><button type="submit">Create New Rules Summary</button></p>
</form>
<script>{script}</script>
</main>"#,
        link = escape(form.bgg_link),
        password = password,
        error = error,
        script = UPLOAD_SCRIPT,
    );

    layout(session, "Create Summary", "", &body)
}

const SEARCH_SCRIPT: &str = r#"
(function () {
  var form = document.getElementById('search-form');
  if (!form) return;
  var input = form.querySelector('input[name=q]');
  input.addEventListener('keydown', function (e) {
    if (e.key === 'Enter' && e.shiftKey) { form.querySelector('input[name=m]').value = form.dataset.previous; }
    if (e.key === 'Escape') { window.location = form.dataset.close; }
  });
  var active = document.querySelector('mark.search-highlight.active');
  if (active) { active.scrollIntoView({ block: 'center' }); }
})();
"#;

fn search_controls(record: &SummaryRecord, search: &SearchOutcome) -> String {
    let id = escape(&record.id);
    let term = escape(&search.term);
    let counter = if search.is_active() {
        let nav_link = |index: usize, label: &str| {
            if search.match_count == 0 {
                format!(r#"<span class="muted">{}</span>"#, label)
            } else {
                format!(
                    r#"<a href="/summary/{id}?q={q}&amp;last={q}&amp;m={m}#match-{m}">{label}</a>"#,
                    id = id,
                    q = percent_encode(&search.term),
                    m = index,
                    label = label,
                )
            }
        };
        format!(
            r#"<span class="muted">{label}</span> {prev} {next} <a href="/summary/{id}" title="Close search">✕</a>"#,
            label = search.label,
            prev = nav_link(search.previous, "Previous"),
            next = nav_link(search.next, "Next"),
            id = id,
        )
    } else {
        String::new()
    };

    // Enter resubmits the same term with the next index; a changed term
    // starts over at the first match.
    format!(
        r#"<form id="search-form" method="get" action="/summary/{id}" data-previous="{previous}" data-close="/summary/{id}" class="no-print">
<input type="search" name="q" value="{term}" placeholder="Search..." autofocus>
<input type="hidden" name="last" value="{term}">
<input type="hidden" name="m" value="{next}">
</form>
{counter}"#,
        id = id,
        previous = search.previous,
        term = term,
        next = search.next,
        counter = counter,
    )
}

/// `GET /summary/{id}`: the rendered summary with search controls.
pub fn summary(
    session: &Session,
    record: &SummaryRecord,
    search: &SearchOutcome,
    can_edit: bool,
) -> String {
    let id = escape(&record.id);
    let mut header = search_controls(record, search);
    header.push_str(&format!(
        r#" <a href="/summary/{id}/raw" class="no-print">Markdown</a> <a href="javascript:window.print()" class="no-print">Print / PDF</a>"#,
        id = id
    ));
    if can_edit {
        header.push_str(&format!(
            r#" <a href="/summary/{id}/edit" class="no-print">Edit</a>"#,
            id = id
        ));
    }

    let link = record
        .bgg_link
        .as_deref()
        .filter(|l| is_web_link(l))
        .map(|l| {
            format!(
                r#" <a href="{href}" rel="noopener">BoardGameGeek</a>"#,
                href = escape(l)
            )
        })
        .unwrap_or_default();

    let body = format!(
        r#"<main class="prose">
{html}
</main>
<footer>
<p class="muted">Generated from <strong>{files}</strong> on {date}.{link}</p>
</footer>
<script>{script}</script>"#,
        html = search.html,
        files = escape(&record.original_filename),
        date = long_date(record.created_at),
        link = link,
        script = SEARCH_SCRIPT,
    );

    layout(session, &record.game_title, &header, &body)
}

/// `GET /summary/{id}/edit`: title, link and markdown editor.
pub fn edit(session: &Session, record: &SummaryRecord, error: Option<&str>) -> String {
    let error = error
        .map(|e| format!(r#"<p class="error">{}</p>"#, escape(e)))
        .unwrap_or_default();
    let body = format!(
        r#"<main>
<h1>Edit {title}</h1>
<form method="post" action="/summary/{id}/edit">
<p><label>Title<br><input type="text" name="game_title" value="{title}" required></label></p>
<p><label>BGG link<br><input type="url" name="bgg_link" value="{link}"></label></p>
<p><label>Markdown<br><textarea name="markdown" rows="30" cols="80" required>{markdown}</textarea></label></p>
{error}
<p><button type="submit">Save</button> <a href="/summary/{id}">Cancel</a></p>
</form>
<form method="post" action="/summary/{id}/delete" onsubmit="return confirm('Delete this summary?');">
<p><button type="submit">Delete summary</button></p>
</form>
</main>"#,
        id = escape(&record.id),
        title = escape(&record.game_title),
        link = escape(record.bgg_link.as_deref().unwrap_or("")),
        markdown = escape(&record.markdown),
        error = error,
    );
    layout(session, &format!("Edit {}", record.game_title), "", &body)
}

/// Generic error page.
pub fn error(session: &Session, message: &str) -> String {
    let body = format!(
        r#"<main>
<h1>Something went wrong</h1>
<p class="error">{}</p>
<p><a href="/upload">Try again</a></p>
</main>"#,
        escape(message)
    );
    layout(session, "Error", create_link(), &body)
}

/// Unknown record id.
pub fn not_found(session: &Session) -> String {
    let body = r#"<main>
<p class="muted">Summary not found.</p>
<p><a href="/">Go Home</a></p>
</main>"#;
    layout(session, "Not found", create_link(), body)
}
