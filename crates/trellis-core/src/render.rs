//! Render boundary
//!
//! A renderer writes a content type and body into the staged response and
//! reports failure as an error. The context's `string`/`json` helpers are
//! thin wrappers over these types; response-formatting collaborators plug in
//! by implementing [`Render`].

use bytes::Bytes;
use serde::Serialize;

use crate::error::Result;
use crate::response::Response;

/// Write content type and body to the staged response.
pub trait Render {
    fn render(&self, res: &mut Response) -> Result<()>;
}

/// Set the content type unless a handler already chose one.
fn write_content_type(res: &mut Response, content_type: &str) {
    if res.header("content-type").is_none() {
        res.set_header("content-type", content_type);
    }
}

/// Plain text body.
pub struct Text(pub String);

impl Render for Text {
    fn render(&self, res: &mut Response) -> Result<()> {
        write_content_type(res, "text/plain; charset=utf-8");
        res.set_body(self.0.clone());
        Ok(())
    }
}

/// JSON body serialized from any `Serialize` value.
pub struct Json<'a, T: Serialize>(pub &'a T);

impl<T: Serialize> Render for Json<'_, T> {
    fn render(&self, res: &mut Response) -> Result<()> {
        let body = serde_json::to_vec(self.0)?;
        write_content_type(res, "application/json; charset=utf-8");
        res.set_body(body);
        Ok(())
    }
}

/// MessagePack body serialized from any `Serialize` value.
pub struct MsgPack<'a, T: Serialize>(pub &'a T);

impl<T: Serialize> Render for MsgPack<'_, T> {
    fn render(&self, res: &mut Response) -> Result<()> {
        let body = rmp_serde::to_vec_named(self.0)?;
        write_content_type(res, "application/msgpack; charset=utf-8");
        res.set_body(body);
        Ok(())
    }
}

/// Raw bytes with an explicit content type.
pub struct Data {
    pub content_type: String,
    pub body: Bytes,
}

impl Render for Data {
    fn render(&self, res: &mut Response) -> Result<()> {
        write_content_type(res, &self.content_type);
        res.set_body(self.body.clone());
        Ok(())
    }
}
