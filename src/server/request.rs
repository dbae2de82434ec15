use super::MetaError;
use std::borrow::Cow;

/// Query parameter that claims a request for this handler
pub const META_PARAM: &str = "meta";

/// Whether the query string asks for metadata
///
/// Any non-empty `meta` value claims the request, `meta=0` and `meta=false`
/// included. When the parameter repeats, one non-empty occurrence is enough.
pub fn is_metadata_request(query: Option<&str>) -> bool {
    query.is_some_and(|q| query_params(q, META_PARAM).any(|value| !value.is_empty()))
}

/// All values of `name` in a `application/x-www-form-urlencoded` query, in order
pub fn query_params<'a>(query: &'a str, name: &'a str) -> impl Iterator<Item = Cow<'a, str>> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .filter(move |(key, _)| decode_component(key) == name)
        .map(|(_, value)| decode_component(value))
}

/// First value of `name` in a `application/x-www-form-urlencoded` query
pub fn query_param<'a>(query: &'a str, name: &'a str) -> Option<Cow<'a, str>> {
    query_params(query, name).next()
}

fn decode_component(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['+', '%']) {
        return Cow::Borrowed(raw);
    }
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => Cow::Owned(decoded.into_owned()),
        Err(_) => Cow::Owned(spaced),
    }
}

/// Percent-decode the URL path component
///
/// Stray `%` signs and escapes that decode to invalid UTF-8 are errors.
pub fn decode_path(raw: &str) -> Result<String, MetaError> {
    let malformed = raw.split('%').skip(1).any(|rest| {
        !rest
            .get(..2)
            .is_some_and(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
    });
    if malformed {
        return Err(MetaError::InvalidRequestPath(format!(
            "malformed percent escape in {raw}"
        )));
    }

    urlencoding::decode(raw)
        .map(Cow::into_owned)
        .map_err(|e| MetaError::InvalidRequestPath(format!("{raw}: {e}")))
}
