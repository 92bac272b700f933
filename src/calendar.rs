//! Month view shown inside the popup.

use std::sync::mpsc::Sender;

use chrono::{Datelike, Local, Months, NaiveDate};
use eframe::egui;

use crate::signals::{Command, ContentSignal, HostRequest};
use crate::surface::Content;
use crate::updater::UpdateState;
use crate::weekday::SUNDAY;

const WEEKDAY_LABELS: [&str; 7] = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"];

pub type Week = [Option<u32>; 7];

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Moves `month_start` by `delta` months. Out-of-range dates stay put.
pub fn shift_month(month_start: NaiveDate, delta: i32) -> NaiveDate {
    let months = Months::new(delta.unsigned_abs());
    let shifted = if delta >= 0 {
        month_start.checked_add_months(months)
    } else {
        month_start.checked_sub_months(months)
    };
    shifted.unwrap_or(month_start)
}

fn days_in_month(month_start: NaiveDate) -> u32 {
    let next = shift_month(month_start, 1);
    if next == month_start {
        return 31;
    }
    next.signed_duration_since(month_start).num_days() as u32
}

/// Rows of day numbers for the month starting at `month_start`. Weeks start
/// on `first_weekday` (1 = Sunday .. 7 = Saturday); cells outside the month
/// are `None`.
pub fn month_grid(month_start: NaiveDate, first_weekday: u8) -> Vec<Week> {
    let offset = u32::from(first_weekday.clamp(1, 7) - 1);
    let leading = (month_start.weekday().num_days_from_sunday() + 7 - offset) % 7;
    let days = days_in_month(month_start);

    let mut weeks = Vec::new();
    let mut week: Week = [None; 7];
    let mut column = leading as usize;
    for day in 1..=days {
        week[column] = Some(day);
        column += 1;
        if column == 7 {
            weeks.push(week);
            week = [None; 7];
            column = 0;
        }
    }
    if column > 0 {
        weeks.push(week);
    }
    weeks
}

pub fn weekday_labels(first_weekday: u8) -> [&'static str; 7] {
    let mut labels = WEEKDAY_LABELS;
    labels.rotate_left(usize::from(first_weekday.clamp(1, 7) - 1));
    labels
}

pub struct CalendarView {
    today: NaiveDate,
    month: NaiveDate,
    first_weekday: u8,
    update: UpdateState,
    menu_open: bool,
    requests: Sender<Command>,
    asked_weekday: bool,
}

impl CalendarView {
    pub fn new(requests: Sender<Command>, today: NaiveDate) -> Self {
        Self {
            today,
            month: first_of_month(today),
            first_weekday: SUNDAY,
            update: UpdateState::default(),
            menu_open: false,
            requests,
            asked_weekday: false,
        }
    }

    #[cfg(test)]
    pub fn month(&self) -> NaiveDate {
        self.month
    }

    #[cfg(test)]
    pub fn update_state(&self) -> &UpdateState {
        &self.update
    }

    fn request(&self, request: HostRequest) {
        if self.requests.send(Command::Host(request)).is_err() {
            tracing::warn!(?request, "coordinator is gone");
        }
    }

    pub fn previous_month(&mut self) {
        self.month = shift_month(self.month, -1);
    }

    pub fn next_month(&mut self) {
        self.month = shift_month(self.month, 1);
    }

    pub fn ui(&mut self, ui: &mut egui::Ui) {
        if !self.asked_weekday {
            self.asked_weekday = true;
            self.request(HostRequest::GetFirstWeekday);
        }

        ui.horizontal(|ui| {
            if ui.small_button("◀").clicked() {
                self.previous_month();
            }
            ui.strong(self.month.format("%B %Y").to_string());
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.small_button("▶").clicked() {
                    self.next_month();
                }
                if ui.small_button("Today").clicked() {
                    self.month = first_of_month(self.today);
                }
            });
        });
        ui.separator();

        let today = (self.month == first_of_month(self.today)).then(|| self.today.day());
        egui::Grid::new("month_grid")
            .num_columns(7)
            .spacing([12.0, 6.0])
            .show(ui, |ui| {
                for label in weekday_labels(self.first_weekday) {
                    ui.weak(label);
                }
                ui.end_row();

                for week in month_grid(self.month, self.first_weekday) {
                    for cell in week {
                        match cell {
                            Some(day) => {
                                ui.add(egui::SelectableLabel::new(
                                    Some(day) == today,
                                    day.to_string(),
                                ));
                            }
                            None => {
                                ui.label("");
                            }
                        }
                    }
                    ui.end_row();
                }
            });

        ui.separator();
        if self.update.available {
            ui.horizontal(|ui| {
                ui.label(format!("Update {} is ready", self.update.release_name))
                    .on_hover_text(self.update.release_notes.as_str());
                if ui.button("Install now").clicked() {
                    self.request(HostRequest::InstallUpdate);
                }
            });
        }

        ui.horizontal(|ui| {
            if ui.small_button("☰").clicked() {
                self.request(HostRequest::ShowConfigMenu);
            }
            if self.menu_open {
                if ui.button("About").clicked() {
                    self.menu_open = false;
                    self.request(HostRequest::ShowAbout);
                }
                if ui.button("Quit").clicked() {
                    self.menu_open = false;
                    self.request(HostRequest::QuitApp);
                }
            }
        });
    }
}

impl Content for CalendarView {
    fn receive(&mut self, signal: ContentSignal) {
        match signal {
            ContentSignal::BackgroundUpdate => {
                self.today = Local::now().date_naive();
                self.month = first_of_month(self.today);
                self.menu_open = false;
            }
            ContentSignal::UpdateDownloaded => self.update.available = true,
            ContentSignal::UpdateReady {
                release_notes,
                release_name,
            } => {
                self.update.available = true;
                self.update.release_notes = release_notes;
                self.update.release_name = release_name;
            }
            ContentSignal::SetFirstWeekday(day) => self.first_weekday = day.clamp(1, 7),
            ContentSignal::OpenConfigMenu => self.menu_open = !self.menu_open,
        }
    }
}
