use uuid::Uuid;

const REF_CODE_LEN: usize = 10;

/// Lowercase, hyphen-separated ASCII slug of `title` with a short unique suffix
pub fn unique_slug(title: &str) -> String {
    let base = slugify(title);
    let mut suffix = Uuid::new_v4().simple().to_string();
    suffix.truncate(8);
    if base.is_empty() {
        suffix
    } else {
        format!("{}-{}", base, suffix)
    }
}

pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Random uppercase reference code shown to clients
pub fn ref_code() -> String {
    let mut code = Uuid::new_v4().simple().to_string().to_uppercase();
    code.truncate(REF_CODE_LEN);
    code
}
