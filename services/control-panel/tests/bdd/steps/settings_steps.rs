//! BDD step definitions for the settings feature

use cucumber::{given, then, when};

use control_panel::config::default_settings_form;
use control_panel::settings::{ConfigRecord, FieldKind, FormField, SettingsForm};

use crate::world::ControlPanelWorld;

fn settings(world: &mut ControlPanelWorld) -> &mut SettingsForm {
    world.settings.as_mut().expect("settings form not set")
}

#[given("the default settings form")]
fn default_form(world: &mut ControlPanelWorld) {
    world.settings = Some(SettingsForm::new(default_settings_form()));
}

#[given(expr = "a settings form with checkboxes {string} offering {string}")]
fn form_with_checkboxes(world: &mut ControlPanelWorld, group: String, options: String) {
    let mut fields = default_settings_form();
    let options = options.split(',').map(|o| o.trim().to_string()).collect();
    fields.push(FormField::new(group, FieldKind::Checkboxes(options)));
    world.settings = Some(SettingsForm::new(fields));
}

#[when(expr = "the configuration sets {string} to {string}")]
fn configuration_sets(world: &mut ControlPanelWorld, key: String, value: String) {
    let record: ConfigRecord = [(key, value)].into_iter().collect();
    settings(world).populate(&record);
}

#[when(expr = "I enter {string} into {string}")]
fn enter_value(world: &mut ControlPanelWorld, value: String, field: String) {
    assert!(settings(world).set_value(&field, value), "no field {field}");
}

#[when(expr = "I uncheck {string} in {string}")]
fn uncheck(world: &mut ControlPanelWorld, option: String, group: String) {
    assert!(settings(world).toggle(&group, &option, false));
}

#[when("the form is serialised")]
fn serialise(world: &mut ControlPanelWorld) {
    let data = settings(world).to_form_data();
    world.form_data = Some(data);
}

#[then(expr = "{string} is checked in {string}")]
fn is_checked(world: &mut ControlPanelWorld, option: String, group: String) {
    assert!(settings(world).is_checked(&group, &option));
}

#[then(expr = "{string} is not checked in {string}")]
fn is_not_checked(world: &mut ControlPanelWorld, option: String, group: String) {
    assert!(!settings(world).is_checked(&group, &option));
}

#[then(expr = "the field {string} shows {string}")]
fn field_shows(world: &mut ControlPanelWorld, field: String, value: String) {
    assert_eq!(settings(world).value(&field), Some(value.as_str()));
}

#[then(expr = "the field {string} is empty")]
fn field_empty(world: &mut ControlPanelWorld, field: String) {
    assert_eq!(settings(world).value(&field), None);
}

#[then(expr = "the serialised {string} is {string}")]
fn serialised_value(world: &mut ControlPanelWorld, key: String, expected: String) {
    let data = world.form_data.as_ref().expect("form not serialised");
    let value = data.get(&key).expect("key missing from form data");
    assert_eq!(value.to_string(), expected);
}
