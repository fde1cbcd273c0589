// Entity recognition prompt templates.

pub const NER_SYSTEM: &str = "\
You are a precise named-entity recognizer for resumes. \
Only report entities that literally occur in the input.";

pub const NER_PROMPT_TEMPLATE: &str = r#"Find the named entities in the following resume text.

INPUT TEXT:
{text}

OUTPUT SCHEMA (return exactly this structure):
{
  "locations": ["string"],
  "entities": ["string"]
}

RULES:
- "locations": countries, states, regions and cities (geo-political entities), in order of first appearance.
- "entities": every other proper noun span: organizations, people, products, technologies, certifications.
- {verbatim}"#;
