pub mod contact;
pub mod dates;
pub mod entities;
pub mod grammar;
pub mod prompts;
pub mod sections;
