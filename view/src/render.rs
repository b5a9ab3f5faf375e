/// Produces the one-line label a row shows for a record.
pub trait Render {
    fn render(&self) -> String;
}
