pub mod drawing_surface;
