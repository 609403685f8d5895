//! Seed helpers shared by the storage tests

use crate::storage::{
    Guru, Kaca, NewGuru, NewKaca, NewPartial, NewSantri, NewUser, Role, Santri, Store, User,
};

fn email_for(name: &str) -> String {
    let local: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    format!("{}@example.com", local)
}

pub(crate) fn seed_guru(store: &Store, name: &str) -> Guru {
    store
        .create_guru(NewGuru {
            name: name.to_string(),
            email: email_for(name),
            phone: None,
            nip: None,
        })
        .unwrap()
}

pub(crate) fn seed_wali(store: &Store, name: &str) -> User {
    store
        .create_user(NewUser {
            name: name.to_string(),
            email: email_for(name),
            role: Role::Wali,
            phone: None,
        })
        .unwrap()
}

pub(crate) fn new_santri(name: &str, nis: &str) -> NewSantri {
    NewSantri {
        name: name.to_string(),
        email: email_for(name),
        phone: None,
        nis: nis.to_string(),
        class_name: None,
        guru_id: None,
        wali_id: None,
        birth_date: None,
    }
}

pub(crate) fn seed_santri(
    store: &Store,
    name: &str,
    nis: &str,
    guru_id: Option<i64>,
    wali_id: Option<i64>,
) -> Santri {
    let mut santri = new_santri(name, nis);
    santri.guru_id = guru_id;
    santri.wali_id = wali_id;
    store.create_santri(santri).unwrap()
}

pub(crate) fn new_kaca(page_number: u32, ayat_start: u32, ayat_end: u32) -> NewKaca {
    NewKaca {
        page_number,
        juz: 1,
        surah_name: if page_number == 1 {
            "Al-Fatihah".to_string()
        } else {
            "Al-Baqarah".to_string()
        },
        ayat_start,
        ayat_end,
        description: None,
    }
}

pub(crate) fn seed_kaca(store: &Store, page_number: u32, ayat_start: u32, ayat_end: u32) -> Kaca {
    store
        .create_kaca(new_kaca(page_number, ayat_start, ayat_end))
        .unwrap()
}

pub(crate) fn new_partial(santri_id: i64, kaca_id: i64, ayat_number: u32) -> NewPartial {
    NewPartial {
        santri_id,
        kaca_id,
        ayat_number,
        progress: "first half".to_string(),
        percentage: 50,
        guru_id: None,
    }
}
