//! HTML templates using Askama.

use askama::Template;

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate<'a> {
    pub prompt_version: &'a str,
}
