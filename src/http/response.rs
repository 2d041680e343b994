/// What a single Host-header probe saw.
///
/// `length` is the server-declared Content-Length when positive, otherwise
/// the number of body bytes actually read. In minimal mode the body is
/// truncated at 8 KiB, so `length` and `body.len()` can diverge.
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: String,
    pub title: String,
    pub length: usize,
}
