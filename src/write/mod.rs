//! Запись белого списка форм значений в бинарный поток.
//!
//! Писатель намеренно узкий: он кодирует только формы из
//! [`Value`](crate::value::Value) и отвечает `Ok(false)` на всё остальное,
//! потому что «не та форма» — ожидаемое, восстановимое состояние для
//! вызывающей стороны, а не ошибка. Интернирование строк живёт в явной
//! сессии [`StringRegistry`] длиной ровно в один вызов.

pub mod driver;
pub mod intern;

pub use driver::{
    try_write_value, write_date_time, write_decimal, write_primitive, write_primitive_array,
    write_primitive_list, write_string, write_string_array, write_string_list, write_string_map,
    write_time_span, write_value_list,
};
pub use intern::{Interned, StringRegistry};
