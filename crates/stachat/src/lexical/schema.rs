use tantivy::schema::{Field, NumericOptions, Schema, SchemaBuilder, TEXT};

/// Tantivy schema for the lexical snapshot.
///
/// Only `content` is tokenized. `ordinal` is the document's position in the
/// snapshot and maps a hit back to the stored [`CandidateDocument`].
///
/// [`CandidateDocument`]: stachat_core::CandidateDocument
#[derive(Clone)]
pub struct LexicalSchema {
    schema: Schema,
    pub content_field: Field,
    pub ordinal_field: Field,
}

impl LexicalSchema {
    pub fn build() -> Self {
        let mut builder = SchemaBuilder::default();
        let content_field = builder.add_text_field("content", TEXT);
        let ordinal_field = builder.add_u64_field(
            "ordinal",
            NumericOptions::default().set_fast().set_stored(),
        );

        Self {
            schema: builder.build(),
            content_field,
            ordinal_field,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}
