pub mod ids;
pub mod jwt;
pub mod pwd;
pub mod record_id;
pub mod signature;
pub mod slug;
pub mod time;
pub mod validated_form;
pub mod validator;
