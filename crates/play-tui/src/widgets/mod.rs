pub mod confirm;
pub mod settings_form;
pub mod song_list;
pub mod status_bar;
pub mod toast;
