macro_rules! linear_ids {
    ($ids:ident, $id:ident, $ty:ty) => {
        pub struct $ids {
            next: crate::utils::numcell::NumCell<$ty>,
        }

        impl Default for $ids {
            fn default() -> Self {
                Self {
                    next: crate::utils::numcell::NumCell::new(1),
                }
            }
        }

        impl $ids {
            pub fn next(&self) -> $id {
                $id(self.next.fetch_add(1))
            }
        }

        #[derive(Copy, Clone, Debug, Hash, Ord, PartialOrd, Eq, PartialEq)]
        pub struct $id($ty);

        #[allow(dead_code)]
        impl $id {
            pub fn raw(self) -> $ty {
                self.0
            }
        }

        impl std::fmt::Display for $id {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

macro_rules! atoms {
    ($name:ident; $($atom:ident,)*) => {
        #[allow(non_snake_case)]
        #[derive(Copy, Clone, Debug)]
        pub struct $name {
            $(pub $atom: u32,)*
        }

        impl $name {
            pub fn load(c: &dyn crate::xcon::XConnection) -> Result<Self, crate::xcon::XconError> {
                Ok(Self {
                    $($atom: c.intern_atom(stringify!($atom))?,)*
                })
            }
        }
    };
}
