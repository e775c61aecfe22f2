pub mod phone;

pub use phone::{hash_phone_number, is_valid_code, normalize_phone, OTP_LENGTH};
